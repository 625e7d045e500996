//! SQL statement construction with sea-query
//!
//! Field and table names are checked against the identifier pattern before
//! a statement is built; values never appear in the SQL text, they travel
//! as bound parameters.

use super::dialect::SqlDialect;
use crate::error::{OdimError, Result};
use crate::query::{NormalizedQuery, Operation, is_identifier, is_truthy};
use crate::search::{SortDirection, SortField};
use odim_signals::Record;
use sea_query::{
	Alias, Asterisk, Condition, Expr, ExprTrait, Func, LikeExpr, Order, Query, QueryStatementWriter, Values,
};
use serde_json::Value;

/// Escape character for `__contains` patterns
pub(crate) const LIKE_ESCAPE: char = '!';

/// LIMIT standing in for "no limit" where OFFSET needs one
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

/// Rendered SQL and its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
	pub sql: String,
	pub values: Values,
}

fn checked(name: &str) -> Result<Alias> {
	if is_identifier(name) {
		Ok(Alias::new(name))
	} else {
		Err(OdimError::Validation(format!("`{}` is not a valid field name", name)))
	}
}

/// Convert a JSON value to a bindable sea-query value
///
/// Arrays and objects are stored as JSON text.
pub(crate) fn sql_value(value: &Value) -> sea_query::Value {
	match value {
		Value::Null => sea_query::Value::BigInt(None),
		Value::Bool(b) => sea_query::Value::Bool(Some(*b)),
		Value::Number(n) => match n.as_i64() {
			Some(i) => sea_query::Value::BigInt(Some(i)),
			None => sea_query::Value::Double(Some(n.as_f64().unwrap_or_default())),
		},
		Value::String(s) => s.clone().into(),
		Value::Array(_) | Value::Object(_) => value.to_string().into(),
	}
}

/// Written values; NULL is a literal so it fits any column type
fn assigned(value: &Value) -> Expr {
	if value.is_null() {
		Expr::cust("NULL")
	} else {
		Expr::val(sql_value(value))
	}
}

/// Escape LIKE wildcards so the needle matches literally
pub(crate) fn escape_like(needle: &str) -> String {
	let mut escaped = String::with_capacity(needle.len());
	for c in needle.chars() {
		if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
			escaped.push(LIKE_ESCAPE);
		}
		escaped.push(c);
	}
	escaped
}

/// Builds statements against one table
#[derive(Debug, Clone)]
pub struct SqlBuilder {
	dialect: SqlDialect,
	table: Alias,
}

impl SqlBuilder {
	pub fn new(dialect: SqlDialect, table: &str) -> Result<Self> {
		Ok(Self {
			dialect,
			table: checked(table)?,
		})
	}

	pub fn dialect(&self) -> SqlDialect {
		self.dialect
	}

	fn render<S: QueryStatementWriter>(&self, statement: &S) -> Statement {
		let (sql, values) = self.dialect.build(statement);
		Statement { sql, values }
	}

	/// SELECT every column; a zero `limit` means unbounded
	pub fn select(&self, filter: &NormalizedQuery, sort: &[SortField], limit: u64, offset: u64) -> Result<Statement> {
		let mut select = Query::select();
		select.column(Asterisk).from(self.table.clone());
		if let Some(condition) = condition(filter)? {
			select.cond_where(condition);
		}
		for field in sort {
			let order = match field.direction {
				SortDirection::Ascending => Order::Asc,
				SortDirection::Descending => Order::Desc,
			};
			select.order_by(checked(&field.field)?, order);
		}
		if limit > 0 {
			select.limit(limit);
		} else if offset > 0 && !self.dialect.allows_bare_offset() {
			select.limit(UNBOUNDED_LIMIT);
		}
		if offset > 0 {
			select.offset(offset);
		}
		Ok(self.render(&select))
	}

	pub fn count(&self, filter: &NormalizedQuery) -> Result<Statement> {
		let mut select = Query::select();
		select
			.expr_as(Expr::cust("COUNT(*)"), Alias::new("cnt"))
			.from(self.table.clone());
		if let Some(condition) = condition(filter)? {
			select.cond_where(condition);
		}
		Ok(self.render(&select))
	}

	/// INSERT of every column in `record`, optionally returning `returning`
	pub fn insert(&self, record: &Record, returning: Option<&str>) -> Result<Statement> {
		let mut insert = Query::insert();
		insert.into_table(self.table.clone());
		if record.is_empty() {
			insert.or_default_values();
		} else {
			let columns = record.keys().map(|field| checked(field)).collect::<Result<Vec<_>>>()?;
			insert.columns(columns);
			insert
				.values(record.values().map(assigned).collect::<Vec<_>>())
				.map_err(|e| OdimError::Validation(e.to_string()))?;
		}
		if let Some(column) = returning {
			insert.returning(Query::returning().column(checked(column)?));
		}
		Ok(self.render(&insert))
	}

	pub fn update(&self, changes: &Record, filter: &NormalizedQuery) -> Result<Statement> {
		if changes.is_empty() {
			return Err(OdimError::Validation("an UPDATE needs at least one column".to_string()));
		}
		let mut update = Query::update();
		update.table(self.table.clone());
		for (field, value) in changes {
			update.value(checked(field)?, assigned(value));
		}
		if let Some(condition) = condition(filter)? {
			update.cond_where(condition);
		}
		Ok(self.render(&update))
	}

	pub fn delete(&self, filter: &NormalizedQuery) -> Result<Statement> {
		let mut delete = Query::delete();
		delete.from_table(self.table.clone());
		if let Some(condition) = condition(filter)? {
			delete.cond_where(condition);
		}
		Ok(self.render(&delete))
	}
}

/// AND of every normalized clause, `None` for an empty filter
fn condition(filter: &NormalizedQuery) -> Result<Option<Condition>> {
	if filter.is_empty() {
		return Ok(None);
	}
	let mut condition = Condition::all();
	for (field, operation, value) in filter.iter() {
		let column = Expr::col(checked(field)?);
		let clause = match operation {
			Operation::Exact if value.is_null() => column.is_null(),
			Operation::NotEqual if value.is_null() => column.is_not_null(),
			Operation::IsNull if is_truthy(value) => column.is_null(),
			Operation::IsNull => column.is_not_null(),
			Operation::Exact => column.eq(Expr::val(sql_value(value))),
			Operation::NotEqual => column.ne(Expr::val(sql_value(value))),
			Operation::Gt => column.gt(Expr::val(sql_value(value))),
			Operation::Gte => column.gte(Expr::val(sql_value(value))),
			Operation::Lt => column.lt(Expr::val(sql_value(value))),
			Operation::Lte => column.lte(Expr::val(sql_value(value))),
			Operation::Contains => {
				let needle = match value {
					Value::String(s) => s.to_lowercase(),
					other => other.to_string(),
				};
				let pattern = LikeExpr::new(format!("%{}%", escape_like(&needle))).escape(LIKE_ESCAPE);
				Expr::from(Func::lower(column)).like(pattern)
			}
		};
		condition = condition.add(clause);
	}
	Ok(Some(condition))
}
