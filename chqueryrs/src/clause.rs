//! Top-level clause detection over raw SQL text.
//!
//! This is a bounded scan, not a parser: it tracks parenthesis depth and
//! skips a leading `WITH` prologue, nothing more. String literals are not
//! tracked, so a `(` or `)` inside a quoted value shifts the depth count.

/// Byte offset of `clause` (e.g. `"WHERE"`, `"GROUP BY"`) in the outermost
/// statement of `sql`, ignoring occurrences nested inside parentheses.
pub fn find_main_clause_position(sql: &str, clause: &str) -> Option<usize> {
    let words: Vec<&str> = clause.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    let start = main_query_start(sql)?;
    scan_top_level(sql, start, &words)
}

/// Offset the main query starts at: 0, or the first depth-0 `SELECT` after a
/// leading `WITH` block.
fn main_query_start(sql: &str) -> Option<usize> {
    match keyword_at(sql, 0, &["WITH"]) {
        Some(with_pos) => scan_top_level(sql, with_pos + "WITH".len(), &["SELECT"]),
        None => Some(0),
    }
}

fn scan_top_level(sql: &str, from: usize, words: &[&str]) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut depth: i64 = 0;
    for pos in from..bytes.len() {
        if depth == 0 {
            if let Some(found) = keyword_at(sql, pos, words) {
                return Some(found);
            }
        }
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Match `words` (separated by any whitespace, case-insensitive) after
/// optional leading whitespace at `pos`. Returns the offset of the first word.
pub(crate) fn keyword_at(sql: &str, pos: usize, words: &[&str]) -> Option<usize> {
    let bytes = sql.as_bytes();
    let start = skip_whitespace(bytes, pos);
    if start > 0 && is_ident_byte(bytes[start - 1]) {
        return None;
    }

    let mut cursor = start;
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            let next = skip_whitespace(bytes, cursor);
            if next == cursor {
                return None;
            }
            cursor = next;
        }
        let end = cursor + word.len();
        if end > bytes.len() || !bytes[cursor..end].eq_ignore_ascii_case(word.as_bytes()) {
            return None;
        }
        cursor = end;
    }

    match bytes.get(cursor) {
        Some(b) if is_ident_byte(*b) => None,
        _ => Some(start),
    }
}

/// End offset of the keyword sequence matched by [`keyword_at`] at `start`.
pub(crate) fn keyword_end(sql: &str, start: usize, words: &[&str]) -> usize {
    let bytes = sql.as_bytes();
    let mut cursor = start;
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            cursor = skip_whitespace(bytes, cursor);
        }
        cursor += word.len();
    }
    cursor.min(bytes.len())
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_top_level_where() {
        let sql = "SELECT * FROM t WHERE x=1";
        assert_eq!(find_main_clause_position(sql, "WHERE"), Some(16));
    }

    #[test]
    fn ignores_nested_clauses() {
        let sql = "SELECT * FROM (SELECT * FROM t WHERE x=1) y";
        assert_eq!(find_main_clause_position(sql, "WHERE"), None);
    }

    #[test]
    fn matches_multi_word_keywords_case_insensitively() {
        let sql = "select a, count() from t group\n  by a";
        assert_eq!(find_main_clause_position(sql, "GROUP BY"), Some(25));
    }

    #[test]
    fn requires_word_boundaries() {
        assert_eq!(find_main_clause_position("SELECT nowhere FROM t", "WHERE"), None);
        assert_eq!(find_main_clause_position("SELECT * FROM t WHERE_x", "WHERE"), None);
        assert_eq!(find_main_clause_position("SELECT limits FROM t", "LIMIT"), None);
    }

    #[test]
    fn skips_cte_prologue() {
        let sql = "WITH a AS (SELECT * FROM t WHERE x = 1) SELECT * FROM a WHERE y = 2";
        let pos = find_main_clause_position(sql, "WHERE").unwrap();
        assert_eq!(&sql[pos..], "WHERE y = 2");
    }

    #[test]
    fn cte_without_main_select_is_not_found() {
        assert_eq!(find_main_clause_position("WITH a AS (SELECT 1 WHERE 1)", "WHERE"), None);
    }

    #[test]
    fn keyword_end_spans_internal_whitespace() {
        let sql = "ORDER   BY x";
        let start = keyword_at(sql, 0, &["ORDER", "BY"]).unwrap();
        assert_eq!(keyword_end(sql, start, &["ORDER", "BY"]), 10);
    }
}
