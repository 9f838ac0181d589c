//! SQL query constants
//!
//! Parameters carry explicit casts so the statements work whether the
//! columns are INT or BIGINT, TIMESTAMP or TIMESTAMPTZ.

/// Append one entry to the assistant query log
pub const INSERT_QUERY_LOG: &str = r#"
    INSERT INTO QUERY (Account_number, Query_text, Query_time)
    VALUES ($1::int4, $2::text, NOW())
"#;

/// Most recent query log entries for one account
pub const LIST_QUERY_LOG: &str = r#"
    SELECT
        COALESCE(Query_text, '')::text AS query_text,
        Query_time::timestamptz AS query_time
    FROM QUERY
    WHERE Account_number = $1::int4
    ORDER BY Query_time DESC
    LIMIT $2::int8
"#;

/// Reference solution for a problem
pub const GET_SOLUTION: &str = r#"
    SELECT
        Solution_ID::int4 AS solution_id,
        Problem_ID::int4 AS problem_id,
        Solution_description::text AS solution_description
    FROM SOLUTION
    WHERE Problem_ID = $1::int4
    LIMIT 1
"#;

pub const INSERT_SOLUTION: &str = r#"
    INSERT INTO SOLUTION (Problem_ID, Solution_description)
    VALUES ($1::int4, $2::text)
"#;

pub const UPDATE_SOLUTION: &str = r#"
    UPDATE SOLUTION
    SET Solution_description = $1::text
    WHERE Problem_ID = $2::int4
"#;

/// Problems with their difficulty and concept; `$1` NULL means no review filter
pub const LIST_PROBLEMS: &str = r#"
    SELECT
        p.Problem_ID::int4 AS problem_id,
        p.Problem_title::text AS title,
        p.Problem_description::text AS description,
        d.Difficulty_level::text AS difficulty_level,
        c.SQL_concept::text AS sql_concept,
        COALESCE(p.Review_status::bool, false) AS reviewed
    FROM PROBLEM p
    LEFT JOIN TAG t ON p.Tag_ID = t.Tag_ID
    LEFT JOIN DIFFICULTY_TAG d ON t.Difficulty_ID = d.Difficulty_ID
    LEFT JOIN CONCEPT_TAG c ON t.Concept_ID = c.Concept_ID
    WHERE $1::bool IS NULL OR COALESCE(p.Review_status::bool, false) = $1::bool
    ORDER BY p.Problem_ID
"#;
