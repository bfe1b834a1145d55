//! Turning page text into cell grids.
//!
//! Both extraction backends deliver plain text lines. Table regions are the
//! runs of non-blank lines on a page; within a region, cells come either
//! from column gutters shared by all lines (layout text) or from splitting
//! each line on wide whitespace gaps (flowed text).

use crate::extraction::PageContent;
use crate::model::RawTable;

/// Minimum run of blank character positions that separates two columns.
const MIN_GUTTER: usize = 2;

/// A run of non-blank lines on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRegion {
    pub page_number: usize,
    pub start_line: usize,
    pub end_line: usize,
}

/// Find the line ranges that could hold a table. Blank lines end a region.
pub fn find_table_regions(page: &PageContent) -> Vec<TableRegion> {
    let mut regions = Vec::new();
    let mut start: Option<usize> = None;

    for (i, line) in page.lines.iter().enumerate() {
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                regions.push(TableRegion {
                    page_number: page.page_number,
                    start_line: s,
                    end_line: i,
                });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }

    if let Some(s) = start {
        regions.push(TableRegion {
            page_number: page.page_number,
            start_line: s,
            end_line: page.lines.len(),
        });
    }

    regions
}

/// Build uniform-width tables from column-aligned text.
pub fn layout_tables(pages: &[PageContent]) -> Vec<RawTable> {
    let mut tables = Vec::new();
    for page in pages {
        for region in find_table_regions(page) {
            let lines: Vec<&str> = page.lines[region.start_line..region.end_line]
                .iter()
                .map(String::as_str)
                .collect();
            let bounds = infer_column_bounds(&lines);
            let rows = lines
                .iter()
                .map(|line| slice_columns(line, &bounds))
                .collect();
            tables.push(RawTable::new(page.page_number, rows));
        }
    }
    tables
}

/// Build ragged tables by splitting every line on whitespace gaps.
pub fn gap_tables(pages: &[PageContent]) -> Vec<RawTable> {
    let mut tables = Vec::new();
    for page in pages {
        for region in find_table_regions(page) {
            let rows = page.lines[region.start_line..region.end_line]
                .iter()
                .map(|line| {
                    split_by_whitespace_gaps(line)
                        .into_iter()
                        .map(|s| Some(s.trim().to_string()))
                        .collect()
                })
                .collect();
            tables.push(RawTable::new(page.page_number, rows));
        }
    }
    tables
}

/// Character offsets where columns start, inferred from positions that
/// are blank in (almost) every line.
///
/// A position counts as blank if at most a tenth of the lines have text
/// there, so a single overlong cell does not merge two columns.
pub fn infer_column_bounds(lines: &[&str]) -> Vec<usize> {
    let rows: Vec<Vec<char>> = lines.iter().map(|l| l.chars().collect()).collect();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return vec![0];
    }

    let tolerance = lines.len() / 10;
    let occupied: Vec<bool> = (0..width)
        .map(|i| {
            rows.iter()
                .filter(|r| r.get(i).is_some_and(|c| !c.is_whitespace()))
                .count()
                > tolerance
        })
        .collect();

    let mut bounds = vec![0];
    let mut gap = 0;
    let mut seen_text = false;
    for (i, &occ) in occupied.iter().enumerate() {
        if occ {
            if seen_text && gap >= MIN_GUTTER {
                bounds.push(i);
            }
            seen_text = true;
            gap = 0;
        } else {
            gap += 1;
        }
    }
    bounds
}

/// Cut a line at the given column starts. Blank cells become `None`.
pub fn slice_columns(line: &str, bounds: &[usize]) -> Vec<Option<String>> {
    let chars: Vec<char> = line.chars().collect();
    bounds
        .iter()
        .enumerate()
        .map(|(k, &start)| {
            let end = bounds.get(k + 1).copied().unwrap_or(usize::MAX).min(chars.len());
            if start >= end {
                return None;
            }
            let cell: String = chars[start..end].iter().collect();
            let cell = cell.trim();
            if cell.is_empty() {
                None
            } else {
                Some(cell.to_string())
            }
        })
        .collect()
}

/// Split a line by gaps of 2+ whitespace characters.
pub fn split_by_whitespace_gaps(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = None;
    let mut end = 0;
    let mut space_count = 0;

    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            space_count += 1;
            if space_count == MIN_GUTTER {
                if let Some(s) = start.take() {
                    segments.push(&line[s..end]);
                }
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            space_count = 0;
            end = i + c.len_utf8();
        }
    }

    if let Some(s) = start {
        segments.push(&line[s..end]);
    }

    segments
}
