//! The fixed SQL keyword table.
//!
//! Keywords are matched case-insensitively through a static `phf` map.
//! Some keywords are non-reserved in SQLite and may still appear as plain
//! identifiers (column names like `key` or `action`); the parser consults
//! [`Keyword::non_reserved`] for those.

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum Keyword {
    Abort,
    Action,
    Add,
    All,
    Alter,
    And,
    As,
    Asc,
    Autoincrement,
    Begin,
    Between,
    By,
    Cascade,
    Case,
    Cast,
    Check,
    Collate,
    Column,
    Commit,
    Conflict,
    Constraint,
    Create,
    Cross,
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
    Default,
    Deferred,
    Delete,
    Desc,
    Distinct,
    Do,
    Drop,
    Else,
    End,
    Escape,
    Except,
    Exclusive,
    Exists,
    Fail,
    Filter,
    First,
    Following,
    Foreign,
    From,
    Full,
    Generated,
    Glob,
    Group,
    Having,
    If,
    Ignore,
    Immediate,
    In,
    Index,
    Inner,
    Insert,
    Intersect,
    Into,
    Is,
    Isnull,
    Join,
    Key,
    Last,
    Left,
    Like,
    Limit,
    Match,
    Materialized,
    Natural,
    No,
    Not,
    Nothing,
    Notnull,
    Null,
    Nulls,
    Of,
    Offset,
    On,
    Or,
    Order,
    Outer,
    Over,
    Partition,
    Pragma,
    Preceding,
    Primary,
    Range,
    Recursive,
    References,
    Regexp,
    Reindex,
    Rename,
    Replace,
    Restrict,
    Returning,
    Right,
    Rollback,
    Row,
    Rowid,
    Rows,
    Select,
    Set,
    Stored,
    Strict,
    Table,
    Temp,
    Temporary,
    Then,
    To,
    Transaction,
    Unbounded,
    Unindexed,
    Union,
    Unique,
    Update,
    Using,
    Values,
    View,
    Virtual,
    When,
    Where,
    Window,
    With,
    Without,
    False,
    True,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
    "ABORT" => Keyword::Abort,
    "ACTION" => Keyword::Action,
    "ADD" => Keyword::Add,
    "ALL" => Keyword::All,
    "ALTER" => Keyword::Alter,
    "AND" => Keyword::And,
    "AS" => Keyword::As,
    "ASC" => Keyword::Asc,
    "AUTOINCREMENT" => Keyword::Autoincrement,
    "BEGIN" => Keyword::Begin,
    "BETWEEN" => Keyword::Between,
    "BY" => Keyword::By,
    "CASCADE" => Keyword::Cascade,
    "CASE" => Keyword::Case,
    "CAST" => Keyword::Cast,
    "CHECK" => Keyword::Check,
    "COLLATE" => Keyword::Collate,
    "COLUMN" => Keyword::Column,
    "COMMIT" => Keyword::Commit,
    "CONFLICT" => Keyword::Conflict,
    "CONSTRAINT" => Keyword::Constraint,
    "CREATE" => Keyword::Create,
    "CROSS" => Keyword::Cross,
    "CURRENT_DATE" => Keyword::CurrentDate,
    "CURRENT_TIME" => Keyword::CurrentTime,
    "CURRENT_TIMESTAMP" => Keyword::CurrentTimestamp,
    "DEFAULT" => Keyword::Default,
    "DEFERRED" => Keyword::Deferred,
    "DELETE" => Keyword::Delete,
    "DESC" => Keyword::Desc,
    "DISTINCT" => Keyword::Distinct,
    "DO" => Keyword::Do,
    "DROP" => Keyword::Drop,
    "ELSE" => Keyword::Else,
    "END" => Keyword::End,
    "ESCAPE" => Keyword::Escape,
    "EXCEPT" => Keyword::Except,
    "EXCLUSIVE" => Keyword::Exclusive,
    "EXISTS" => Keyword::Exists,
    "FAIL" => Keyword::Fail,
    "FALSE" => Keyword::False,
    "FILTER" => Keyword::Filter,
    "FIRST" => Keyword::First,
    "FOLLOWING" => Keyword::Following,
    "FOREIGN" => Keyword::Foreign,
    "FROM" => Keyword::From,
    "FULL" => Keyword::Full,
    "GENERATED" => Keyword::Generated,
    "GLOB" => Keyword::Glob,
    "GROUP" => Keyword::Group,
    "HAVING" => Keyword::Having,
    "IF" => Keyword::If,
    "IGNORE" => Keyword::Ignore,
    "IMMEDIATE" => Keyword::Immediate,
    "IN" => Keyword::In,
    "INDEX" => Keyword::Index,
    "INNER" => Keyword::Inner,
    "INSERT" => Keyword::Insert,
    "INTERSECT" => Keyword::Intersect,
    "INTO" => Keyword::Into,
    "IS" => Keyword::Is,
    "ISNULL" => Keyword::Isnull,
    "JOIN" => Keyword::Join,
    "KEY" => Keyword::Key,
    "LAST" => Keyword::Last,
    "LEFT" => Keyword::Left,
    "LIKE" => Keyword::Like,
    "LIMIT" => Keyword::Limit,
    "MATCH" => Keyword::Match,
    "MATERIALIZED" => Keyword::Materialized,
    "NATURAL" => Keyword::Natural,
    "NO" => Keyword::No,
    "NOT" => Keyword::Not,
    "NOTHING" => Keyword::Nothing,
    "NOTNULL" => Keyword::Notnull,
    "NULL" => Keyword::Null,
    "NULLS" => Keyword::Nulls,
    "OF" => Keyword::Of,
    "OFFSET" => Keyword::Offset,
    "ON" => Keyword::On,
    "OR" => Keyword::Or,
    "ORDER" => Keyword::Order,
    "OUTER" => Keyword::Outer,
    "OVER" => Keyword::Over,
    "PARTITION" => Keyword::Partition,
    "PRAGMA" => Keyword::Pragma,
    "PRECEDING" => Keyword::Preceding,
    "PRIMARY" => Keyword::Primary,
    "RANGE" => Keyword::Range,
    "RECURSIVE" => Keyword::Recursive,
    "REFERENCES" => Keyword::References,
    "REGEXP" => Keyword::Regexp,
    "REINDEX" => Keyword::Reindex,
    "RENAME" => Keyword::Rename,
    "REPLACE" => Keyword::Replace,
    "RESTRICT" => Keyword::Restrict,
    "RETURNING" => Keyword::Returning,
    "RIGHT" => Keyword::Right,
    "ROLLBACK" => Keyword::Rollback,
    "ROW" => Keyword::Row,
    "ROWID" => Keyword::Rowid,
    "ROWS" => Keyword::Rows,
    "SELECT" => Keyword::Select,
    "SET" => Keyword::Set,
    "STORED" => Keyword::Stored,
    "STRICT" => Keyword::Strict,
    "TABLE" => Keyword::Table,
    "TEMP" => Keyword::Temp,
    "TEMPORARY" => Keyword::Temporary,
    "THEN" => Keyword::Then,
    "TO" => Keyword::To,
    "TRANSACTION" => Keyword::Transaction,
    "TRUE" => Keyword::True,
    "UNBOUNDED" => Keyword::Unbounded,
    "UNINDEXED" => Keyword::Unindexed,
    "UNION" => Keyword::Union,
    "UNIQUE" => Keyword::Unique,
    "UPDATE" => Keyword::Update,
    "USING" => Keyword::Using,
    "VALUES" => Keyword::Values,
    "VIEW" => Keyword::View,
    "VIRTUAL" => Keyword::Virtual,
    "WHEN" => Keyword::When,
    "WHERE" => Keyword::Where,
    "WINDOW" => Keyword::Window,
    "WITH" => Keyword::With,
    "WITHOUT" => Keyword::Without,
};

impl Keyword {
    /// Case-insensitive lookup against the fixed table.
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS.get(word.to_ascii_uppercase().as_str()).copied()
    }

    /// The canonical (uppercase) spelling.
    pub fn as_str(&self) -> &'static str {
        KEYWORDS
            .entries()
            .find(|(_, kw)| **kw == *self)
            .map(|(s, _)| *s)
            .expect("keyword present in table")
    }

    /// Keywords SQLite treats as non-reserved: they may be used as bare
    /// identifiers (table, column or function names).
    pub fn non_reserved(&self) -> bool {
        matches!(
            self,
            Keyword::Abort
                | Keyword::Action
                | Keyword::Cascade
                | Keyword::Conflict
                | Keyword::Deferred
                | Keyword::Do
                | Keyword::Fail
                | Keyword::First
                | Keyword::Following
                | Keyword::Ignore
                | Keyword::Immediate
                | Keyword::Key
                | Keyword::Last
                | Keyword::Materialized
                | Keyword::No
                | Keyword::Nothing
                | Keyword::Nulls
                | Keyword::Of
                | Keyword::Partition
                | Keyword::Preceding
                | Keyword::Range
                | Keyword::Recursive
                | Keyword::Rename
                | Keyword::Replace
                | Keyword::Restrict
                | Keyword::Row
                | Keyword::Rowid
                | Keyword::Rows
                | Keyword::Stored
                | Keyword::Strict
                | Keyword::Temp
                | Keyword::Temporary
                | Keyword::Unbounded
                | Keyword::Unindexed
                | Keyword::View
                | Keyword::Virtual
                | Keyword::Window
        )
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Keyword::lookup("select"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("SeLeCt"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("current_timestamp"), Some(Keyword::CurrentTimestamp));
        assert_eq!(Keyword::lookup("not_a_keyword"), None);
    }

    #[test]
    fn canonical_spelling_round_trips() {
        assert_eq!(Keyword::Select.as_str(), "SELECT");
        assert_eq!(Keyword::lookup(Keyword::Between.as_str()), Some(Keyword::Between));
    }

    #[test]
    fn key_is_usable_as_identifier() {
        assert!(Keyword::Key.non_reserved());
        assert!(!Keyword::Select.non_reserved());
    }
}
