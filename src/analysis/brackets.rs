// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Structural checks for Paradox script: brace balance and string
//! termination. Comments start at `#` and run to the end of the line.

use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

use super::{Analyzer, AnalyzerError, DIAGNOSTIC_SOURCE};
use crate::document::{PositionEncoding, byte_to_column, line_spans};

/// Reports unbalanced braces and unterminated strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketAnalyzer {
    encoding: PositionEncoding,
}

impl BracketAnalyzer {
    /// Creates an analyzer reporting ranges in `encoding`.
    #[must_use]
    pub const fn new(encoding: PositionEncoding) -> Self {
        Self { encoding }
    }

    fn diagnostic(&self, line_no: u32, line: &str, byte: usize, code: &str, message: String) -> Diagnostic {
        let start = byte_to_column(line, byte, self.encoding);
        let end = byte_to_column(line, byte + 1, self.encoding);
        Diagnostic {
            range: Range::new(Position::new(line_no, start), Position::new(line_no, end)),
            severity: Some(DiagnosticSeverity::ERROR),
            code: Some(NumberOrString::String(code.to_string())),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message,
            ..Default::default()
        }
    }
}

impl Analyzer for BracketAnalyzer {
    fn validate(&self, text: &str) -> Result<Vec<Diagnostic>, AnalyzerError> {
        let mut diagnostics = Vec::new();
        // (line number, byte offset in line, line span) of each unclosed '{'
        let mut open_braces = Vec::new();

        for (line_idx, span) in line_spans(text).into_iter().enumerate() {
            let line_no = u32::try_from(line_idx)
                .map_err(|_| AnalyzerError(format!("too many lines: {line_idx}")))?;
            let line = &text[span.clone()];
            let mut string_start: Option<usize> = None;
            let mut escaped = false;

            for (byte, c) in line.char_indices() {
                if string_start.is_some() {
                    match c {
                        _ if escaped => escaped = false,
                        '\\' => escaped = true,
                        '"' => string_start = None,
                        _ => {}
                    }
                    continue;
                }

                match c {
                    '#' => break,
                    '"' => string_start = Some(byte),
                    '{' => open_braces.push((line_no, byte, span.clone())),
                    '}' => {
                        if open_braces.pop().is_none() {
                            diagnostics.push(self.diagnostic(
                                line_no,
                                line,
                                byte,
                                "unmatched-close-brace",
                                "Unmatched '}'".to_string(),
                            ));
                        }
                    }
                    _ => {}
                }
            }

            if let Some(start) = string_start {
                diagnostics.push(self.diagnostic(
                    line_no,
                    line,
                    start,
                    "unterminated-string",
                    "Unterminated string literal".to_string(),
                ));
            }
        }

        for (line_no, byte, span) in open_braces {
            diagnostics.push(self.diagnostic(
                line_no,
                &text[span],
                byte,
                "unclosed-brace",
                "Unclosed '{'".to_string(),
            ));
        }

        diagnostics.sort_by_key(|d| (d.range.start.line, d.range.start.character));
        Ok(diagnostics)
    }
}
