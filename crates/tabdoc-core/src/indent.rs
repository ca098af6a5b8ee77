//! Indentation tracking
//!
//! Indentation is measured in leading whitespace characters; tabs and
//! spaces count the same.

/// Direction of indentation change between two lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Forward,
    Backward,
    Nothing,
}

/// Count of leading whitespace characters (0 for a blank line)
pub fn tab_count(line: &str) -> usize {
    if line.trim().is_empty() {
        return 0;
    }
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Compare the indentation of two lines
pub fn classify(previous: &str, current: &str) -> Delta {
    let (prev, curr) = (tab_count(previous), tab_count(current));
    if curr > prev {
        Delta::Forward
    } else if curr < prev {
        Delta::Backward
    } else {
        Delta::Nothing
    }
}

/// Signed indentation difference `previous - current`
pub fn delta(previous: usize, current: usize) -> isize {
    previous as isize - current as isize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_count() {
        assert_eq!(tab_count("a = 1"), 0);
        assert_eq!(tab_count("\t\ta = 1"), 2);
        assert_eq!(tab_count("    a"), 4);
        assert_eq!(tab_count("\t  a"), 3);
        assert_eq!(tab_count("   "), 0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("a", "\tb"), Delta::Forward);
        assert_eq!(classify("\t\tb", "a"), Delta::Backward);
        assert_eq!(classify("\ta", "\tb"), Delta::Nothing);
    }

    #[test]
    fn test_delta() {
        assert_eq!(delta(3, 1), 2);
        assert_eq!(delta(0, 2), -2);
    }
}
