//! Session block assignment from break info.

use crate::io::BreakInfo;

/// Block (1..=3) of the trial at `order`; 0 when it falls past the last block.
pub fn block_of(order: usize, info: &BreakInfo) -> u8 {
    let b1 = info.before_break1;
    let b2 = b1 + info.before_break2;
    let b3 = b2 + info.after;
    if order < b1 {
        1
    } else if order < b2 {
        2
    } else if order < b3 {
        3
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_boundaries() {
        let info = BreakInfo {
            before_break1: 40,
            before_break2: 38,
            after: 41,
        };
        assert_eq!(block_of(0, &info), 1);
        assert_eq!(block_of(39, &info), 1);
        assert_eq!(block_of(40, &info), 2);
        assert_eq!(block_of(77, &info), 2);
        assert_eq!(block_of(78, &info), 3);
        assert_eq!(block_of(118, &info), 3);
        assert_eq!(block_of(119, &info), 0);
    }
}
