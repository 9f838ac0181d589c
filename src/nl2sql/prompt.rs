//! Schema-grounded prompt for SQL generation

use crate::llm::Message;

/// Row cap the model is asked to respect. Advisory only; nothing enforces it.
pub const SUGGESTED_ROW_LIMIT: u32 = 50;

const SYSTEM_PROMPT: &str =
    "You are a SQL expert. Generate only valid SELECT SQL queries.";

/// Tables the model may query, one line each
pub const SCHEMA_DESCRIPTION: &str = "\
SQL Study Room Database Schema:

Core Tables:
1. PROBLEM (Problem_ID, Tag_ID, Problem_title, Problem_description, Review_status, Solution_ID) - practice problems
2. TAG (Tag_ID, Difficulty_ID, Concept_ID) - links a problem to its difficulty and concept
3. DIFFICULTY_TAG (Difficulty_ID, Difficulty_level) - ENUM('EASY','MEDIUM','HARD')
4. CONCEPT_TAG (Concept_ID, SQL_concept) - e.g. 'BASIC','JOIN','AGGREGATION','CONDITIONAL'
5. SOLUTION (Solution_ID, Problem_ID, Solution_description, Review_status) - reference solutions

User Tables:
6. USER_PROFILE (Email, First_name, Last_name) - personal details
7. ACCOUNT (Account_number, Email, Register_date, Student_flag, Admin_flag) - platform accounts
8. USER_AUTH (Email, Password) - credentials

Activity Tables:
9. SUBMISSION (Submission_ID, Problem_ID, Account_number, Submission_description, Is_correct, Time_start, Time_end) - graded answers
10. ATTEMPT (Attempt_ID, Problem_ID, Account_number, Attempt_number, Is_submitted, Submission_ID) - work in progress
11. QUERY (Query_ID, Account_number, Query_text, Query_time) - assistant query log

Sample Queries:
- Easy problems: SELECT * FROM PROBLEM p JOIN TAG t ON p.Tag_ID = t.Tag_ID JOIN DIFFICULTY_TAG d ON t.Difficulty_ID = d.Difficulty_ID WHERE d.Difficulty_level = 'EASY'
- User submissions: SELECT * FROM SUBMISSION s JOIN ACCOUNT a ON s.Account_number = a.Account_number JOIN USER_PROFILE u ON a.Email = u.Email
- Problem statistics: SELECT p.Problem_ID, COUNT(s.Submission_ID) FROM PROBLEM p LEFT JOIN SUBMISSION s ON p.Problem_ID = s.Problem_ID GROUP BY p.Problem_ID
";

/// Build the system and user messages for one question
pub fn build_messages(question: &str) -> Vec<Message> {
    let user = format!(
        "{schema}\n\
         Convert this natural language question to a SQL SELECT query:\n\
         \"{question}\"\n\n\
         Rules:\n\
         - Only generate SELECT statements\n\
         - Use proper table JOINs when needed\n\
         - Return only the SQL query, no explanations\n\
         - Limit results to {limit} rows maximum\n\n\
         SQL Query:\n",
        schema = SCHEMA_DESCRIPTION,
        question = question,
        limit = SUGGESTED_ROW_LIMIT,
    );

    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}
