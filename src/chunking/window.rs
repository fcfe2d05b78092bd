//! Fixed-size sliding window over a file's lines.

use super::{LineBlock, MIN_CHUNK_LINES, SLIDING_WINDOW_OVERLAP, SLIDING_WINDOW_SIZE};

/// Produce overlapping window blocks covering `total_lines`.
///
/// Windows are at most `SLIDING_WINDOW_SIZE` lines and advance by
/// `SLIDING_WINDOW_SIZE - SLIDING_WINDOW_OVERLAP` lines. A trailing window
/// shorter than `MIN_CHUNK_LINES` is dropped; its lines were already covered
/// by the previous window's overlap. Window blocks carry no symbol name.
pub(crate) fn sliding_blocks(total_lines: usize) -> Vec<LineBlock> {
    let step = SLIDING_WINDOW_SIZE - SLIDING_WINDOW_OVERLAP;
    let mut blocks = Vec::new();
    let mut start = 1usize;

    while start <= total_lines {
        let end = (start + SLIDING_WINDOW_SIZE - 1).min(total_lines);
        let len = end - start + 1;

        if len < MIN_CHUNK_LINES && !blocks.is_empty() {
            break;
        }
        if len >= MIN_CHUNK_LINES {
            blocks.push(LineBlock {
                start_line: start,
                end_line: end,
                symbol_name: None,
            });
        } else {
            // Sole window of a tiny file; below the minimum, emit nothing.
            break;
        }

        if end == total_lines {
            break;
        }
        start += step;
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_file_single_window() {
        let blocks = sliding_blocks(10);
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].start_line, blocks[0].end_line), (1, 10));
    }

    #[test]
    fn test_exact_window_size() {
        let blocks = sliding_blocks(SLIDING_WINDOW_SIZE);
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].start_line, blocks[0].end_line), (1, 60));
    }

    #[test]
    fn test_step_is_window_minus_overlap() {
        let blocks = sliding_blocks(150);
        assert_eq!(blocks[0].start_line, 1);
        assert_eq!(blocks[1].start_line, 46);
        assert_eq!(blocks[2].start_line, 91);
    }

    #[test]
    fn test_windows_overlap_by_fifteen() {
        let blocks = sliding_blocks(150);
        for pair in blocks.windows(2) {
            let overlap = pair[0].end_line - pair[1].start_line + 1;
            assert_eq!(overlap, SLIDING_WINDOW_OVERLAP);
        }
    }

    #[test]
    fn test_trailing_short_window_dropped() {
        // 61 lines: second window is 46..=61 (16 lines, kept).
        // 92 lines: a third window at 91 would be 2 lines, so it never
        // appears and the second window absorbs the tail.
        assert_eq!(sliding_blocks(61).len(), 2);
        assert_eq!(sliding_blocks(92).len(), 2);
    }

    #[test]
    fn test_tiny_file_yields_nothing() {
        assert!(sliding_blocks(2).is_empty());
        assert!(sliding_blocks(0).is_empty());
    }

    #[test]
    fn test_full_coverage() {
        for total in [3usize, 59, 60, 61, 100, 137, 200] {
            let blocks = sliding_blocks(total);
            let mut covered = vec![false; total];
            for b in &blocks {
                for line in b.start_line..=b.end_line {
                    covered[line - 1] = true;
                }
            }
            let uncovered = covered.iter().filter(|&&c| !c).count();
            // Only a sub-minimum tail may remain uncovered, and it is
            // always shorter than the overlap.
            assert!(uncovered < MIN_CHUNK_LINES, "total={total} uncovered={uncovered}");
        }
    }
}
