// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Post-OCR text tidying.
//
// Recognition engines emit ragged whitespace: trailing blanks, runs of
// spaces inside lines, stacks of empty lines between blocks. This pass
// normalizes that without touching the recognized words themselves —
// confidence scores and word order are unaffected.

/// Tidy recognized lines: collapse runs of spaces and tabs, trim line edges,
/// collapse runs of blank lines to a single blank, and drop leading/trailing
/// blanks.
pub fn tidy_lines(lines: &[String]) -> Vec<String> {
    let mut tidied: Vec<String> = Vec::with_capacity(lines.len());

    for line in lines {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            // Keep at most one blank between text blocks.
            if matches!(tidied.last(), Some(last) if last.is_empty()) {
                continue;
            }
            tidied.push(String::new());
        } else {
            tidied.push(collapsed);
        }
    }

    while matches!(tidied.first(), Some(first) if first.is_empty()) {
        tidied.remove(0);
    }
    while matches!(tidied.last(), Some(last) if last.is_empty()) {
        tidied.pop();
    }

    tidied
}
