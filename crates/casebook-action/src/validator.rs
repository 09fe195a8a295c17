//! The gate between model text and the executor.
//!
//! A completion moves through staged checks: parse, shape check, schema
//! check, allow-list check. Each stage rejects with its own error kind so a
//! caller can report *why* a completion was refused:
//!
//! - text that is neither a single read expression nor a record batch is
//!   [`ValidationError::MalformedAction`];
//! - text that matches a shape but violates the declared field/column list
//!   is [`ValidationError::SchemaViolation`];
//! - text that reaches outside the registered operation surface (write
//!   statements, subqueries, joins, unlisted functions, set operations) is
//!   [`ValidationError::UnsafeAction`].
//!
//! Accepted read expressions are re-rendered from the parsed AST, so the
//! executor never sees the model's original bytes.

use casebook_schema::{Record, SchemaRegistry};
use serde_json::{Map as JsonMap, Value as JsonValue};
use sqlparser::ast::{
    BinaryOperator, Distinct, Expr, FunctionArg, FunctionArgExpr, GroupByExpr, Ident, ObjectName,
    Query, Select, SelectItem, SetExpr, Statement, TableFactor, UnaryOperator, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::{Action, InsertAction, QueryAction};

/// Functions a read expression may call.
const ALLOWED_FUNCTIONS: [&str; 3] = ["count", "lower", "upper"];

#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    /// The completion is neither a single read expression nor a record batch.
    #[error("malformed action: {0}")]
    MalformedAction(String),
    /// The completion matched a shape but violates the declared schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    /// The completion reaches outside the registered operation surface.
    #[error("unsafe action: {0}")]
    UnsafeAction(String),
}

use ValidationError::{MalformedAction, SchemaViolation, UnsafeAction};

enum Candidate {
    Sql(Statement),
    Records(Vec<JsonMap<String, JsonValue>>),
}

/// Validates untrusted completions into [`Action`] values.
pub struct Validator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Validate a completion into either accepted shape.
    pub fn validate(&self, completion: &str) -> Result<Action, ValidationError> {
        match self.parse(completion)? {
            Candidate::Sql(statement) => self.admit_query(statement),
            Candidate::Records(objects) => self.admit_records(objects),
        }
    }

    /// Validate a completion that must be a read expression.
    pub fn validate_query(&self, completion: &str) -> Result<QueryAction, ValidationError> {
        match self.validate(completion)? {
            Action::Query(query) => Ok(query),
            Action::Insert(_) => Err(MalformedAction(
                "expected a read expression, got a record batch".to_string(),
            )),
        }
    }

    /// Validate a completion that must be a record batch.
    pub fn validate_mutation(&self, completion: &str) -> Result<InsertAction, ValidationError> {
        match self.validate(completion)? {
            Action::Insert(batch) => Ok(batch),
            Action::Query(_) => Err(MalformedAction(
                "expected a record batch, got a read expression".to_string(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Stage 1: parse
    // ------------------------------------------------------------------

    fn parse(&self, completion: &str) -> Result<Candidate, ValidationError> {
        let text = completion.trim();
        if text.is_empty() {
            return Err(MalformedAction("empty completion".to_string()));
        }

        // A record batch is a JSON array; JSON can never parse as SQL, so the
        // leading bracket decides which grammar applies.
        if text.starts_with('[') {
            let value: JsonValue = serde_json::from_str(text)
                .map_err(|e| MalformedAction(format!("invalid record batch: {e}")))?;
            let JsonValue::Array(items) = value else {
                return Err(MalformedAction("record batch must be a JSON array".to_string()));
            };
            if items.is_empty() {
                return Err(MalformedAction("record batch is empty".to_string()));
            }
            let mut objects = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                match item {
                    JsonValue::Object(map) => objects.push(map),
                    other => {
                        return Err(MalformedAction(format!(
                            "record {idx} is not an object: {other}"
                        )))
                    }
                }
            }
            return Ok(Candidate::Records(objects));
        }

        let mut statements = Parser::parse_sql(&GenericDialect {}, text).map_err(|e| {
            MalformedAction(format!("not a read expression or record batch: {e}"))
        })?;
        if statements.len() != 1 {
            return Err(MalformedAction(format!(
                "expected a single statement, got {}",
                statements.len()
            )));
        }
        tracing::trace!("completion parsed as SQL");
        Ok(Candidate::Sql(statements.remove(0)))
    }

    // ------------------------------------------------------------------
    // Record batches: shape + schema
    // ------------------------------------------------------------------

    fn admit_records(
        &self,
        objects: Vec<JsonMap<String, JsonValue>>,
    ) -> Result<Action, ValidationError> {
        let fields = self.registry.record_fields();
        let mut records = Vec::with_capacity(objects.len());
        for (idx, object) in objects.iter().enumerate() {
            for field in fields {
                match object.get(*field) {
                    Some(JsonValue::String(_)) => {}
                    Some(other) => {
                        return Err(SchemaViolation(format!(
                            "record {idx}: field `{field}` must be a string, got {other}"
                        )))
                    }
                    None => {
                        return Err(SchemaViolation(format!(
                            "record {idx}: missing field `{field}`"
                        )))
                    }
                }
            }
            for key in object.keys() {
                if !fields.contains(&key.as_str()) {
                    return Err(SchemaViolation(format!(
                        "record {idx}: unknown field `{key}`"
                    )));
                }
            }
            records.push(Record {
                agent_name: string_field(object, "agent_name"),
                customer_email: string_field(object, "customer_email"),
                customer_order: string_field(object, "customer_order"),
                customer_phone: string_field(object, "customer_phone"),
                customer_sentiment: string_field(object, "customer_sentiment"),
            });
        }
        tracing::debug!(records = records.len(), "record batch accepted");
        Ok(Action::Insert(InsertAction::new(records)))
    }

    // ------------------------------------------------------------------
    // Read expressions: shape, schema, allow-list
    // ------------------------------------------------------------------

    fn admit_query(&self, statement: Statement) -> Result<Action, ValidationError> {
        let Statement::Query(query) = &statement else {
            return Err(UnsafeAction(
                "statement is not part of the read surface".to_string(),
            ));
        };
        let select = self.select_body(query)?;
        self.check_query_schema(query, select)?;
        self.check_allow_list(query, select)?;
        let sql = statement.to_string();
        tracing::debug!(%sql, "read expression accepted");
        Ok(Action::Query(QueryAction::new(sql)))
    }

    /// Shape: a single plain `SELECT` over exactly one plain table.
    fn select_body<'q>(&self, query: &'q Query) -> Result<&'q Select, ValidationError> {
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(UnsafeAction(
                "only a plain SELECT is allowed (no set operations or VALUES)".to_string(),
            ));
        };
        if select.from.len() != 1 {
            return Err(UnsafeAction(
                "exactly one table must appear in FROM".to_string(),
            ));
        }
        let table = &select.from[0];
        if !table.joins.is_empty() {
            return Err(UnsafeAction("joins are not allowed".to_string()));
        }
        match &table.relation {
            TableFactor::Table { args: Some(_), .. } => {
                Err(UnsafeAction("table functions are not allowed".to_string()))
            }
            TableFactor::Table { .. } => Ok(select),
            _ => Err(UnsafeAction(
                "derived tables and subqueries are not allowed in FROM".to_string(),
            )),
        }
    }

    /// Schema: the table and every referenced column must be registered.
    fn check_query_schema(&self, query: &Query, select: &Select) -> Result<(), ValidationError> {
        if let TableFactor::Table { name, .. } = &select.from[0].relation {
            self.check_table(name)?;
        }

        let mut columns: Vec<Ident> = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    collect_columns(expr, &mut columns)
                }
                SelectItem::QualifiedWildcard(name, _) => self.check_table(name)?,
                SelectItem::Wildcard(_) => {}
            }
        }
        if let Some(selection) = &select.selection {
            collect_columns(selection, &mut columns);
        }
        if let GroupByExpr::Expressions(exprs) = &select.group_by {
            for expr in exprs {
                collect_columns(expr, &mut columns);
            }
        }
        for order in &query.order_by {
            collect_columns(&order.expr, &mut columns);
        }

        for ident in &columns {
            if !self.registry.is_readable_column(&ident.value) {
                return Err(SchemaViolation(format!("unknown column `{}`", ident.value)));
            }
        }
        Ok(())
    }

    fn check_table(&self, name: &ObjectName) -> Result<(), ValidationError> {
        let registered = name.0.len() == 1
            && name.0[0].value.eq_ignore_ascii_case(self.registry.table());
        if registered {
            Ok(())
        } else {
            Err(SchemaViolation(format!("unknown table `{name}`")))
        }
    }

    /// Allow-list: only constructs on the registered read surface survive.
    fn check_allow_list(&self, query: &Query, select: &Select) -> Result<(), ValidationError> {
        if query.with.is_some() {
            return Err(UnsafeAction("WITH clauses are not allowed".to_string()));
        }
        if !query.locks.is_empty() {
            return Err(UnsafeAction("locking clauses are not allowed".to_string()));
        }
        if query.offset.is_some() || query.fetch.is_some() {
            return Err(UnsafeAction(
                "OFFSET and FETCH are not allowed; use LIMIT".to_string(),
            ));
        }
        if let Some(limit) = &query.limit {
            if !matches!(limit, Expr::Value(Value::Number(_, _))) {
                return Err(UnsafeAction("LIMIT must be a number literal".to_string()));
            }
        }
        match &select.distinct {
            None | Some(Distinct::Distinct) => {}
            Some(Distinct::On(_)) => {
                return Err(UnsafeAction("DISTINCT ON is not allowed".to_string()))
            }
        }
        if select.top.is_some() || select.into.is_some() {
            return Err(UnsafeAction("TOP and INTO are not allowed".to_string()));
        }
        if !select.lateral_views.is_empty()
            || !select.named_window.is_empty()
            || select.qualify.is_some()
        {
            return Err(UnsafeAction(
                "lateral views, named windows, and QUALIFY are not allowed".to_string(),
            ));
        }
        if select.having.is_some() {
            return Err(UnsafeAction("HAVING is not allowed".to_string()));
        }
        if !select.cluster_by.is_empty()
            || !select.distribute_by.is_empty()
            || !select.sort_by.is_empty()
        {
            return Err(UnsafeAction(
                "dialect-specific clustering clauses are not allowed".to_string(),
            ));
        }
        match &select.group_by {
            GroupByExpr::Expressions(exprs) => {
                for expr in exprs {
                    self.check_expr(expr)?;
                }
            }
            GroupByExpr::All => {
                return Err(UnsafeAction("GROUP BY ALL is not allowed".to_string()))
            }
        }

        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    self.check_expr(expr)?
                }
                SelectItem::QualifiedWildcard(_, _) | SelectItem::Wildcard(_) => {}
            }
        }
        if let Some(selection) = &select.selection {
            self.check_expr(selection)?;
        }
        for order in &query.order_by {
            self.check_expr(&order.expr)?;
        }
        Ok(())
    }

    fn check_expr(&self, expr: &Expr) -> Result<(), ValidationError> {
        match expr {
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => Ok(()),
            Expr::Value(Value::Placeholder(_)) => {
                Err(UnsafeAction("placeholders are not allowed".to_string()))
            }
            Expr::Value(_) => Ok(()),
            Expr::Nested(inner) | Expr::IsNull(inner) | Expr::IsNotNull(inner) => {
                self.check_expr(inner)
            }
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => self.check_expr(expr),
            Expr::BinaryOp { left, op, right } => {
                if !allowed_operator(op) {
                    return Err(UnsafeAction(format!("operator `{op}` is not allowed")));
                }
                self.check_expr(left)?;
                self.check_expr(right)
            }
            Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
                self.check_expr(expr)?;
                self.check_expr(pattern)
            }
            Expr::InList { expr, list, .. } => {
                self.check_expr(expr)?;
                for item in list {
                    self.check_expr(item)?;
                }
                Ok(())
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.check_expr(expr)?;
                self.check_expr(low)?;
                self.check_expr(high)
            }
            Expr::Function(func) => {
                if func.name.0.len() != 1
                    || !ALLOWED_FUNCTIONS
                        .iter()
                        .any(|f| func.name.0[0].value.eq_ignore_ascii_case(f))
                {
                    return Err(UnsafeAction(format!(
                        "function `{}` is not allowed",
                        func.name
                    )));
                }
                if func.over.is_some() {
                    return Err(UnsafeAction(
                        "window functions are not allowed".to_string(),
                    ));
                }
                for arg in &func.args {
                    match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => {}
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => {
                            self.check_expr(expr)?
                        }
                        _ => {
                            return Err(UnsafeAction(
                                "only plain function arguments are allowed".to_string(),
                            ))
                        }
                    }
                }
                Ok(())
            }
            other => Err(UnsafeAction(format!(
                "expression `{other}` is not allowed"
            ))),
        }
    }
}

fn allowed_operator(op: &BinaryOperator) -> bool {
    matches!(
        op,
        BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::LtEq
            | BinaryOperator::GtEq
            | BinaryOperator::And
            | BinaryOperator::Or
    )
}

/// Collect every column identifier reachable from `expr`.
///
/// Deliberately tolerant of constructs the allow-list will later reject: the
/// schema gate only cares about names, and runs before the allow-list gate so
/// rejections stay attributable to the right stage.
fn collect_columns(expr: &Expr, out: &mut Vec<Ident>) {
    match expr {
        Expr::Identifier(ident) => out.push(ident.clone()),
        Expr::CompoundIdentifier(parts) => {
            if let Some(last) = parts.last() {
                out.push(last.clone());
            }
        }
        Expr::Nested(inner)
        | Expr::IsNull(inner)
        | Expr::IsNotNull(inner)
        | Expr::UnaryOp { expr: inner, .. } => collect_columns(inner, out),
        Expr::BinaryOp { left, right, .. } => {
            collect_columns(left, out);
            collect_columns(right, out);
        }
        Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
            collect_columns(expr, out);
            collect_columns(pattern, out);
        }
        Expr::InList { expr, list, .. } => {
            collect_columns(expr, out);
            for item in list {
                collect_columns(item, out);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            collect_columns(expr, out);
            collect_columns(low, out);
            collect_columns(high, out);
        }
        Expr::Function(func) => {
            for arg in &func.args {
                if let FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) = arg {
                    collect_columns(expr, out);
                }
            }
        }
        _ => {}
    }
}

fn string_field(object: &JsonMap<String, JsonValue>, field: &str) -> String {
    object
        .get(field)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}
