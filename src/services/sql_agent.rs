// src/services/sql_agent.rs
//! SQL toolkit and the Thought/Action/Observation loop that drives it.
//!
//! The model sees a fixed preamble, the tool list and a scratchpad of the
//! steps taken so far. Each completion either names a tool to run (its
//! output is appended as an `Observation:`) or gives a `Final Answer:`.

use tracing::{debug, info, warn};

use super::agent::AgentError;
use super::database::SqlDatabase;
use super::ollama::LanguageModel;

const STOP_SEQUENCES: &[&str] = &["\nObservation:", "\n\tObservation:"];
const FINAL_ANSWER: &str = "Final Answer:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";

/// Tools the agent can call. Each takes a single string input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlTool {
    Query,
    Schema,
    ListTables,
    QueryChecker,
}

impl SqlTool {
    pub const ALL: [SqlTool; 4] = [
        SqlTool::Query,
        SqlTool::Schema,
        SqlTool::ListTables,
        SqlTool::QueryChecker,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SqlTool::Query => "sql_db_query",
            SqlTool::Schema => "sql_db_schema",
            SqlTool::ListTables => "sql_db_list_tables",
            SqlTool::QueryChecker => "sql_db_query_checker",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SqlTool::Query => {
                "Input to this tool is a detailed and correct SQL query, output is a result \
                 from the database. If the query is not correct, an error message will be \
                 returned. If an error is returned, rewrite the query, check the query, and \
                 try again. If you encounter an issue with unknown columns, use \
                 sql_db_schema to query the correct table fields."
            }
            SqlTool::Schema => {
                "Input to this tool is a comma-separated list of tables, output is the schema \
                 and sample rows for those tables. Be sure that the tables actually exist by \
                 calling sql_db_list_tables first! Example Input: table1, table2, table3"
            }
            SqlTool::ListTables => {
                "Input is an empty string, output is a comma-separated list of tables in the \
                 database."
            }
            SqlTool::QueryChecker => {
                "Use this tool to double check if your query is correct before executing it. \
                 Always use this tool before executing a query with sql_db_query!"
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// One parsed model completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    Action { tool: String, input: String },
    Finish(String),
    Invalid(String),
}

/// A tool call the agent made and what it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStep {
    pub tool: String,
    pub input: String,
    pub observation: String,
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub steps: Vec<AgentStep>,
}

/// A reasoning agent bound to one model and one read-only store handle.
pub struct SqlAgent<M> {
    model: M,
    db: SqlDatabase,
    max_iterations: usize,
    top_k: usize,
}

impl<M: LanguageModel> SqlAgent<M> {
    pub fn new(model: M, db: SqlDatabase) -> Self {
        Self {
            model,
            db,
            max_iterations: 15,
            top_k: 10,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Run the loop until the model gives a final answer or the iteration
    /// budget is spent.
    pub async fn run(&self, question: &str) -> Result<AgentRun, AgentError> {
        let mut scratchpad = String::new();
        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            let prompt = self.build_prompt(question, &scratchpad);
            let raw = self.model.complete(&prompt, STOP_SEQUENCES).await?;
            let output = strip_reasoning(&raw);

            let observation = match parse_output(&output) {
                ParsedOutput::Finish(answer) => {
                    info!(iteration, tool_calls = steps.len(), "agent finished");
                    return Ok(AgentRun { answer, steps });
                }
                ParsedOutput::Action { tool, input } => {
                    debug!(iteration, tool = %tool, input_len = input.len(), "agent action");
                    let observation = self.invoke(&tool, &input).await;
                    steps.push(AgentStep {
                        tool,
                        input,
                        observation: observation.clone(),
                    });
                    observation
                }
                ParsedOutput::Invalid(message) => {
                    debug!(iteration, "unparseable agent output");
                    message
                }
            };

            scratchpad.push_str(output.trim());
            scratchpad.push_str("\nObservation: ");
            scratchpad.push_str(&observation);
            scratchpad.push_str("\nThought: ");
        }

        warn!(max_iterations = self.max_iterations, "agent hit iteration limit");
        Err(AgentError::IterationLimit(self.max_iterations))
    }

    async fn invoke(&self, tool: &str, input: &str) -> String {
        let Some(tool) = SqlTool::from_name(tool) else {
            return format!("{tool} is not a valid tool, try one of [{}].", tool_names());
        };

        let result = match tool {
            SqlTool::ListTables => self.db.table_names().await.map(|names| names.join(", ")),
            SqlTool::Schema => {
                let tables: Vec<&str> = input
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect();
                self.db.table_info(&tables).await
            }
            SqlTool::Query => self
                .db
                .run(strip_query_fences(input))
                .await
                .map(|out| out.to_tuple_list()),
            SqlTool::QueryChecker => {
                let prompt = query_checker_prompt(self.db.dialect(), strip_query_fences(input));
                return match self.model.complete(&prompt, &[]).await {
                    Ok(text) => strip_reasoning(&text).trim().to_owned(),
                    Err(e) => format!("Error: {e}"),
                };
            }
        };

        result.unwrap_or_else(|e| format!("Error: {e}"))
    }

    fn build_prompt(&self, question: &str, scratchpad: &str) -> String {
        let tools = SqlTool::ALL
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are an agent designed to interact with a SQL database.\n\
             Given an input question, create a syntactically correct {dialect} query to run, \
             then look at the results of the query and return the answer.\n\
             Unless the user specifies a specific number of examples they wish to obtain, \
             always limit your query to at most {top_k} results.\n\
             You can order the results by a relevant column to return the most interesting \
             examples in the database.\n\
             Never query for all the columns from a specific table, only ask for the relevant \
             columns given the question.\n\
             You have access to tools for interacting with the database.\n\
             Only use the below tools. Only use the information returned by the below tools \
             to construct your final answer.\n\
             You MUST double check your query before executing it. If you get an error while \
             executing a query, rewrite the query and try again.\n\n\
             DO NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.\n\n\
             If the question does not seem related to the database, just return \
             \"I don't know\" as the answer.\n\n\
             {tools}\n\n\
             Use the following format:\n\n\
             Question: the input question you must answer\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, should be one of [{names}]\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\
             ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original input question\n\n\
             Begin!\n\n\
             Question: {question}\n\
             Thought: I should look at the tables in the database to see what I can query.  \
             Then I should query the schema of the most relevant tables.\n\
             {scratchpad}",
            dialect = self.db.dialect(),
            top_k = self.top_k,
            names = tool_names(),
        )
    }
}

fn tool_names() -> String {
    SqlTool::ALL
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn query_checker_prompt(dialect: &str, query: &str) -> String {
    format!(
        "{query}\n\
         Double check the {dialect} query above for common mistakes, including:\n\
         - Using NOT IN with NULL values\n\
         - Using UNION when UNION ALL should have been used\n\
         - Using BETWEEN for exclusive ranges\n\
         - Data type mismatch in predicates\n\
         - Properly quoting identifiers\n\
         - Using the correct number of arguments for functions\n\
         - Casting to the correct data type\n\
         - Using the proper columns for joins\n\n\
         If there are any of the above mistakes, rewrite the query. If there are no \
         mistakes, just reproduce the original query.\n\n\
         Output the final SQL query only.\n\n\
         SQL Query: "
    )
}

/// Parse a completion into the next step.
///
/// Whichever of `Action:` and `Final Answer:` appears first decides: a
/// model that names an action and then hallucinates its result has its
/// action run instead.
pub fn parse_output(text: &str) -> ParsedOutput {
    let final_at = text.find(FINAL_ANSWER);
    let action_at = text.find(ACTION);

    match (action_at, final_at) {
        (Some(a), f) if f.is_none_or(|f| a < f) => {
            let after_action = &text[a + ACTION.len()..];
            let Some(i) = after_action.find(ACTION_INPUT) else {
                return ParsedOutput::Invalid(
                    "Invalid Format: Missing 'Action Input:' after 'Action:'".to_owned(),
                );
            };
            let tool = after_action[..i]
                .trim()
                .trim_matches(|c| c == '`' || c == '[' || c == ']')
                .trim()
                .to_owned();
            let input = after_action[i + ACTION_INPUT.len()..]
                .trim()
                .trim_matches('"')
                .to_owned();
            ParsedOutput::Action { tool, input }
        }
        (_, Some(f)) => ParsedOutput::Finish(text[f + FINAL_ANSWER.len()..].trim().to_owned()),
        _ => ParsedOutput::Invalid(
            "Invalid Format: Missing 'Action:' after 'Thought:'".to_owned(),
        ),
    }
}

/// Drop `<think>…</think>` blocks some models emit before answering.
/// An unterminated block swallows the rest of the text.
pub fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_query_fences(input: &str) -> &str {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix("```sql").unwrap_or(trimmed);
    trimmed.trim_matches('`').trim()
}
