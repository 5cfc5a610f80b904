//! Configuration pretty-printing

use super::{Configuration, Manager};
use crate::cli::styles::{HEADER, INFO, RESET};

use figment::{value::Value, Metadata};
use std::fmt::Display;

/// One row of the rendered configuration
struct Row {
    field: String,
    value: String,
    source: String,
}

impl Row {
    fn render_source(meta: Option<&Metadata>) -> String {
        meta.map(|m| {
            m.source
                .as_ref()
                .map_or_else(|| m.name.to_string(), figment::Source::to_string)
        })
        .unwrap_or_default()
    }

    fn render_value(value: &Value) -> String {
        match value {
            Value::String(_tag, s) => s.to_string(),
            Value::Char(_tag, c) => c.to_string(),
            Value::Bool(_tag, b) => b.to_string(),
            Value::Num(_tag, num) => num
                .to_i128()
                .map(|i| i.to_string())
                .or_else(|| num.to_u128().map(|u| u.to_string()))
                .or_else(|| num.to_f64().map(|f| f.to_string()))
                .unwrap_or_default(),
            Value::Empty(_tag, _) => "<empty>".into(),
            Value::Array(_tag, vec) => format!(
                "[{}]",
                vec.iter()
                    .map(Row::render_value)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            Value::Dict(_tag, dict) => format!("{{{} entries}}", dict.len()),
        }
    }
}

/// Pretty-printing type wrapper to Manager
#[derive(Debug)]
pub struct DisplayAdapter<'a> {
    source: &'a Manager,
}

impl Manager {
    /// Creates an ephemeral structure implementing `Display`, which lists every
    /// [`Configuration`] field with its current value and where that value came from.
    #[must_use]
    pub fn to_display_adapter(&self) -> DisplayAdapter<'_> {
        DisplayAdapter { source: self }
    }
}

impl Display for DisplayAdapter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = &self.source.data;
        let rows: Vec<Row> = Configuration::FIELDS
            .iter()
            .filter_map(|field| {
                let value = data.find_value(field).ok()?;
                Some(Row {
                    field: (*field).to_string(),
                    value: Row::render_value(&value),
                    source: Row::render_source(data.get_metadata(value.tag())),
                })
            })
            .collect();
        let fw = rows.iter().map(|r| r.field.len()).max().unwrap_or(0).max(5);
        let vw = rows.iter().map(|r| r.value.len()).max().unwrap_or(0).max(5);
        writeln!(
            f,
            "{HEADER}{:fw$}{RESET}  {HEADER}{:vw$}{RESET}  {HEADER}source{RESET}",
            "field", "value"
        )?;
        for r in rows {
            writeln!(
                f,
                "{:fw$}  {INFO}{:vw$}{RESET}  {}",
                r.field, r.value, r.source
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::config::{ConfigurationOverrides, Manager};
    use assertables::assert_contains;

    #[test]
    fn lists_fields_and_sources() {
        let mut mgr = Manager::empty();
        mgr.merge_provider(ConfigurationOverrides {
            port_attempts: Some(3),
            ..Default::default()
        });
        mgr.apply_system_default();
        let out = anstream::adapter::strip_str(&mgr.to_display_adapter().to_string()).to_string();
        assert_contains!(out, "transfer_ports");
        assert_contains!(out, "20000-30000");
        assert_contains!(out, "command line");
        assert_contains!(out, "default");
        let line = out
            .lines()
            .find(|l| l.starts_with("port_attempts"))
            .unwrap();
        assert_contains!(line, "3");
        assert_contains!(line, "command line");
    }
}
