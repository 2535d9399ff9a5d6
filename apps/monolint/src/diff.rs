//! Line diff for check-mode reports.
//!
//! Uses a longest-common-subsequence table; convention files are small, so
//! the quadratic table is fine.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Same(&'a str),
    Added(&'a str),
    Removed(&'a str),
}

impl DiffLine<'_> {
    fn is_change(&self) -> bool {
        !matches!(self, DiffLine::Same(_))
    }
}

/// Diff `before` against `after`, line by line.
pub fn diff_lines<'a>(before: &'a str, after: &'a str) -> Vec<DiffLine<'a>> {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();
    let (n, m) = (old.len(), new.len());

    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            out.push(DiffLine::Same(old[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(old[i]));
            i += 1;
        } else {
            out.push(DiffLine::Added(new[j]));
            j += 1;
        }
    }
    out.extend(old[i..].iter().map(|l| DiffLine::Removed(l)));
    out.extend(new[j..].iter().map(|l| DiffLine::Added(l)));
    out
}

/// Render the changed region (first change through last change) with
/// `+ `/`- `/`  ` prefixes. Empty when nothing differs.
pub fn render(before: &str, after: &str) -> Vec<String> {
    let lines = diff_lines(before, after);
    let Some(first) = lines.iter().position(DiffLine::is_change) else {
        return Vec::new();
    };
    let last = lines.iter().rposition(DiffLine::is_change).unwrap_or(first);
    lines[first..=last]
        .iter()
        .map(|line| match line {
            DiffLine::Same(l) => format!("  {l}"),
            DiffLine::Added(l) => format!("+ {l}"),
            DiffLine::Removed(l) => format!("- {l}"),
        })
        .collect()
}
