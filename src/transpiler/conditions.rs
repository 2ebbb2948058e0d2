//! WHERE clause rendering.

use crate::ast::{ColumnRef, Predicate, Value};
use crate::transpiler::select::LiteralMode;
use crate::transpiler::traits::SqlGenerator;

/// Renders literal values inline or collects them as bound parameters.
pub struct LiteralWriter<'g> {
    generator: &'g dyn SqlGenerator,
    mode: LiteralMode,
    params: Vec<Value>,
}

impl<'g> LiteralWriter<'g> {
    pub fn new(generator: &'g dyn SqlGenerator, mode: LiteralMode) -> Self {
        Self {
            generator,
            mode,
            params: Vec::new(),
        }
    }

    pub fn write(&mut self, value: &Value) -> String {
        // NULL stays inline so `= NULL` reads the same in both modes.
        if self.mode == LiteralMode::Inline || value.is_null() {
            return self.generator.format_literal(value);
        }
        let placeholder = self.generator.placeholder(self.params.len());
        self.params.push(value.clone());
        placeholder
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// `[alias].[column]`
pub fn column_sql(generator: &dyn SqlGenerator, column: &ColumnRef) -> String {
    format!(
        "{}.{}",
        generator.quote_identifier(&column.alias.to_string()),
        generator.quote_identifier(&column.column)
    )
}

/// Render a predicate tree. Returns an empty string when nothing renders.
///
/// A group is parenthesized when more than one child renders; a group with
/// a single rendered child collapses to that child.
pub fn render_predicate(predicate: &Predicate, writer: &mut LiteralWriter<'_>) -> String {
    match predicate {
        Predicate::Comparison { column, op, value } => {
            let lhs = column_sql(writer.generator, column);
            let rhs = writer.write(value);
            format!("{} {} {}", lhs, op.as_sql(), rhs)
        }
        Predicate::Group { op, children } => {
            let parts: Vec<String> = children
                .iter()
                .map(|child| render_predicate(child, writer))
                .filter(|sql| !sql.is_empty())
                .collect();
            match parts.len() {
                0 => String::new(),
                1 => parts.into_iter().next().unwrap_or_default(),
                _ => format!("({})", parts.join(&format!(" {} ", op))),
            }
        }
    }
}
