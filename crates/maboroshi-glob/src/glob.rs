//! Slash-aware glob matching over relative paths.

use std::cell::Cell;

/// Upper bound on total matcher calls per pattern. Caps the backtracking
/// cost of adversarial patterns like `*a*a*a*...*a`; counted as total work,
/// not stack depth.
const MAX_MATCH_CALLS: usize = 100_000;

/// Check whether a string contains glob metacharacters (`*`, `?`, `[`, `{`).
///
/// Callers that treat literal paths and patterns differently (the dependency
/// graph orders literal matches before wildcard matches) use this to tell
/// the two apart.
///
/// ```
/// use maboroshi_glob::is_pattern;
/// assert!(is_pattern("view/*.svelte"));
/// assert!(is_pattern("src/**/[ab].go"));
/// assert!(!is_pattern("src/main.go"));
/// ```
pub fn is_pattern(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[') || s.contains('{')
}

/// Match a slash-separated path against a glob pattern.
///
/// The whole path must match. `*` and `?` stop at `/`; `**` does not.
///
/// ```
/// use maboroshi_glob::glob_match;
/// assert!(glob_match("view/*.svelte", "view/index.svelte"));
/// assert!(!glob_match("view/*.svelte", "view/nested/index.svelte"));
/// assert!(glob_match("view/**", "view/nested/index.svelte"));
/// assert!(glob_match("**/*.{go,svelte}", "internal/web/web.go"));
/// ```
pub fn glob_match(pattern: &str, path: &str) -> bool {
    let calls = Cell::new(0usize);
    let path: Vec<char> = path.chars().collect();
    for pat in expand_braces(pattern) {
        let pat: Vec<char> = pat.chars().collect();
        if match_from(&pat, 0, &path, 0, &calls) {
            return true;
        }
    }
    false
}

/// Expand `{a,b,c}` alternation groups into the full set of literal patterns.
///
/// Nested groups are supported. A pattern without braces expands to itself.
///
/// ```
/// use maboroshi_glob::expand_braces;
/// assert_eq!(expand_braces("*.{go,rs}"), vec!["*.go", "*.rs"]);
/// assert_eq!(expand_braces("plain"), vec!["plain"]);
/// ```
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let mut done = Vec::new();
    let mut work = vec![pattern.to_string()];

    while let Some(pat) = work.pop() {
        match first_group(&pat) {
            None => done.push(pat),
            Some((start, end)) => {
                let prefix = &pat[..start];
                let suffix = &pat[end + 1..];
                for alt in split_alternatives(&pat[start + 1..end]) {
                    work.push(format!("{}{}{}", prefix, alt, suffix));
                }
            }
        }
    }

    // Work-stack order is reversed relative to the pattern; restore it so
    // expansion order is stable for callers that display the set.
    done.reverse();
    done
}

/// Locate the first top-level `{...}` group, returning byte offsets of the
/// braces. Unbalanced braces mean no group.
fn first_group(pattern: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in pattern.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(s) = start {
                        return Some((s, i));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Split group content on top-level commas.
fn split_alternatives(content: &str) -> Vec<String> {
    let mut alts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in content.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                alts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    alts.push(current);
    alts
}

/// Work-bounded backtracking matcher. Returns false once the call budget is
/// exhausted, which reads as "no match" rather than hanging.
fn match_from(pat: &[char], pi: usize, path: &[char], ii: usize, calls: &Cell<usize>) -> bool {
    let spent = calls.get() + 1;
    calls.set(spent);
    if spent > MAX_MATCH_CALLS {
        return false;
    }

    if pi >= pat.len() {
        return ii >= path.len();
    }

    match pat[pi] {
        '*' => {
            let mut next = pi;
            while next < pat.len() && pat[next] == '*' {
                next += 1;
            }
            let deep = next - pi >= 2;

            // `**/` consumes zero or more whole segments.
            if deep && next < pat.len() && pat[next] == '/' {
                if match_from(pat, next + 1, path, ii, calls) {
                    return true;
                }
                let mut j = ii;
                while j < path.len() {
                    if path[j] == '/' {
                        return match_from(pat, pi, path, j + 1, calls);
                    }
                    j += 1;
                }
                return false;
            }

            if next >= pat.len() {
                // Trailing `*` must not cross a separator; trailing `**` may.
                return deep || !path[ii..].contains(&'/');
            }

            let mut skip = 0;
            loop {
                if match_from(pat, next, path, ii + skip, calls) {
                    return true;
                }
                if ii + skip >= path.len() {
                    return false;
                }
                if !deep && path[ii + skip] == '/' {
                    return false;
                }
                skip += 1;
            }
        }

        '?' => {
            ii < path.len() && path[ii] != '/' && match_from(pat, pi + 1, path, ii + 1, calls)
        }

        '[' => {
            if ii >= path.len() {
                return false;
            }
            match char_class(&pat[pi..], path[ii]) {
                Some((true, used)) => match_from(pat, pi + used, path, ii + 1, calls),
                Some((false, _)) | None => false,
            }
        }

        '\\' if pi + 1 < pat.len() => {
            ii < path.len()
                && pat[pi + 1] == path[ii]
                && match_from(pat, pi + 2, path, ii + 1, calls)
        }

        c => ii < path.len() && c == path[ii] && match_from(pat, pi + 1, path, ii + 1, calls),
    }
}

/// Evaluate a `[...]` class against one character.
///
/// Returns `(matched, chars_consumed)`, or `None` for an unterminated class
/// (which the caller treats as a non-match rather than a literal `[`).
fn char_class(pat: &[char], ch: char) -> Option<(bool, usize)> {
    debug_assert_eq!(pat.first(), Some(&'['));
    let mut i = 1;

    let negate = matches!(pat.get(i), Some('!') | Some('^'));
    if negate {
        i += 1;
    }

    let body_start = i;
    let mut matched = false;
    loop {
        let c = *pat.get(i)?;
        // `]` closes the class unless it is the first body character.
        if c == ']' && i > body_start {
            i += 1;
            break;
        }
        // Range like `a-z` (a trailing `-` before `]` is literal).
        if pat.get(i + 1) == Some(&'-') && pat.get(i + 2).is_some_and(|&e| e != ']') {
            let end = pat[i + 2];
            if ch >= c && ch <= end {
                matched = true;
            }
            i += 3;
            continue;
        }
        if c == ch {
            matched = true;
        }
        i += 1;
    }

    Some((matched != negate, i))
}
