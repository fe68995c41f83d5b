//! Scripted (Lua) template expansion
//!
//! A scripted template is a Lua chunk that defines a global
//! `GenerateConfig(context)` function. The chunk runs in a brand-new Lua
//! state per expansion; `context` exposes read-only `properties`,
//! `imports` and `env` fields. The function returns either YAML text or a
//! table describing the document.

use mlua::{DeserializeOptions, Function, Lua, LuaSerdeExt, SerializeOptions, Table, Value};

use crate::error::ExpansionError;

use super::context::{EvaluationContext, TemplateContext};
use super::sandbox;

/// Name of the function every scripted template must define
pub const ENTRY_POINT: &str = "GenerateConfig";

const READ_ONLY_CONTEXT: &str = r#"
local fields = ...
return setmetatable({}, {
    __index = fields,
    __newindex = function(_, key)
        error("evaluation context is read-only: cannot set '" .. tostring(key) .. "'", 2)
    end,
    __metatable = false,
})
"#;

/// What a scripted template handed back
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedDocument {
    /// YAML text, to be parsed by the caller
    Text(String),
    /// A document built directly from a returned table
    Structured(serde_yaml::Value),
}

/// Run a scripted template and collect its generated document
///
/// Any failure while compiling or running the script is reported as an
/// execution error naming `file_name`, with the Lua traceback attached.
pub fn expand_scripted(
    source: &str,
    file_name: &str,
    context: &TemplateContext,
) -> Result<GeneratedDocument, ExpansionError> {
    run(source, file_name, context).map_err(|err| ExpansionError::Execution {
        source_file: file_name.to_string(),
        trace: err.to_string(),
    })
}

fn run(source: &str, file_name: &str, context: &TemplateContext) -> mlua::Result<GeneratedDocument> {
    let lua = sandbox::lua_state(&context.imports)?;

    lua.load(source).set_name(format!("@{}", file_name)).exec()?;

    let generate: Function = lua
        .globals()
        .get::<Option<Function>>(ENTRY_POINT)?
        .ok_or_else(|| {
            mlua::Error::runtime(format!(
                "{} does not define a function {}(context)",
                file_name, ENTRY_POINT
            ))
        })?;

    let evaluation = evaluation_table(&lua, context.evaluation_context())?;

    match generate.call::<Value>(evaluation)? {
        Value::String(text) => Ok(GeneratedDocument::Text(text.to_str()?.to_string())),
        table @ Value::Table(_) => {
            let options = DeserializeOptions::new().sort_keys(true);
            let document = lua.from_value_with(table, options)?;
            Ok(GeneratedDocument::Structured(empty_resources_as_list(document)))
        }
        other => Err(mlua::Error::runtime(format!(
            "{} must return a string or a table, got {}",
            ENTRY_POINT,
            other.type_name()
        ))),
    }
}

/// An empty Lua table has no array part, so `resources = {}` arrives as a
/// mapping; read it as the empty list it was written as
fn empty_resources_as_list(mut document: serde_yaml::Value) -> serde_yaml::Value {
    if let serde_yaml::Value::Mapping(map) = &mut document {
        if let Some(resources) = map.get_mut("resources") {
            if matches!(resources, serde_yaml::Value::Mapping(m) if m.is_empty()) {
                *resources = serde_yaml::Value::Sequence(Vec::new());
            }
        }
    }
    document
}

fn serialize_options() -> SerializeOptions {
    SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false)
}

/// Build the read-only `context` argument; absent fields are `nil`
fn evaluation_table(lua: &Lua, ctx: EvaluationContext<'_>) -> mlua::Result<Table> {
    let fields = lua.create_table()?;
    fields.set("properties", lua.to_value_with(&ctx.properties, serialize_options())?)?;
    fields.set("imports", lua.to_value_with(&ctx.imports, serialize_options())?)?;
    fields.set("env", lua.to_value_with(&ctx.env, serialize_options())?)?;

    lua.load(READ_ONLY_CONTEXT)
        .set_name("=evaluation_context")
        .call(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Env;
    use crate::document::Resource;
    use crate::template::ImportMap;

    fn context(resource: &str, imports: &ImportMap) -> TemplateContext {
        let resource = Resource::from_value(serde_yaml::from_str(resource).unwrap()).unwrap();
        let properties = resource.properties.clone();
        let mut env = Env::new();
        env.insert("project".to_string(), "acme".to_string());
        TemplateContext::new(&resource, properties, imports, &env)
    }

    #[test]
    fn test_returns_text() {
        let imports = ImportMap::new();
        let ctx = context("{name: db, type: db.lua, properties: {size: 10}}", &imports);
        let source = r#"
            function GenerateConfig(context)
                return "resources:\n- name: " .. context.env.name .. "-disk\n  type: disk\n"
                    .. "  properties:\n    sizeGb: " .. context.properties.size .. "\n"
            end
        "#;

        let out = expand_scripted(source, "db.lua", &ctx).unwrap();
        assert_eq!(
            out,
            GeneratedDocument::Text(
                "resources:\n- name: db-disk\n  type: disk\n  properties:\n    sizeGb: 10\n"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_returns_table() {
        let imports = ImportMap::new();
        let ctx = context("{name: db, type: db.lua}", &imports);
        let source = r#"
            function GenerateConfig(context)
                return { resources = { { name = "a", type = "disk" } } }
            end
        "#;

        let out = expand_scripted(source, "db.lua", &ctx).unwrap();
        let expected: serde_yaml::Value =
            serde_yaml::from_str("resources:\n- name: a\n  type: disk\n").unwrap();
        assert_eq!(out, GeneratedDocument::Structured(expected));
    }

    #[test]
    fn test_empty_resources_table_is_a_list() {
        let imports = ImportMap::new();
        let ctx = context("{name: none, type: none.lua}", &imports);
        let source = "function GenerateConfig(ctx) return { resources = {} } end";

        let out = expand_scripted(source, "none.lua", &ctx).unwrap();
        let expected: serde_yaml::Value = serde_yaml::from_str("resources: []").unwrap();
        assert_eq!(out, GeneratedDocument::Structured(expected));
    }

    #[test]
    fn test_missing_properties_is_nil() {
        let imports = ImportMap::new();
        let ctx = context("{name: db, type: db.lua}", &imports);
        let source = r#"
            function GenerateConfig(context)
                return tostring(context.properties == nil)
            end
        "#;

        let out = expand_scripted(source, "db.lua", &ctx).unwrap();
        assert_eq!(out, GeneratedDocument::Text("true".to_string()));
    }

    #[test]
    fn test_context_is_read_only() {
        let imports = ImportMap::new();
        let ctx = context("{name: db, type: db.lua}", &imports);
        let source = r#"
            function GenerateConfig(context)
                context.env = {}
                return "resources: []"
            end
        "#;

        let err = expand_scripted(source, "db.lua", &ctx).unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_missing_entry_point() {
        let imports = ImportMap::new();
        let ctx = context("{name: db, type: db.lua}", &imports);
        let err = expand_scripted("local x = 1", "db.lua", &ctx).unwrap_err();
        match err {
            ExpansionError::Execution { source_file, trace } => {
                assert_eq!(source_file, "db.lua");
                assert!(trace.contains(ENTRY_POINT));
            }
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[test]
    fn test_runtime_error_names_source() {
        let imports = ImportMap::new();
        let ctx = context("{name: db, type: db.lua}", &imports);
        let source = r#"
            function GenerateConfig(context)
                error("boom")
            end
        "#;

        let err = expand_scripted(source, "db.lua", &ctx).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Exception in db.lua\n"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_syntax_error() {
        let imports = ImportMap::new();
        let ctx = context("{name: db, type: db.lua}", &imports);
        let err = expand_scripted("function GenerateConfig(", "db.lua", &ctx).unwrap_err();
        assert!(matches!(err, ExpansionError::Execution { .. }));
    }

    #[test]
    fn test_each_run_gets_a_fresh_state() {
        let imports = ImportMap::new();
        let ctx = context("{name: db, type: db.lua}", &imports);
        let source = r#"
            counter = (counter or 0) + 1
            function GenerateConfig(context)
                return tostring(counter)
            end
        "#;

        let first = expand_scripted(source, "db.lua", &ctx).unwrap();
        let second = expand_scripted(source, "db.lua", &ctx).unwrap();
        assert_eq!(first, GeneratedDocument::Text("1".to_string()));
        assert_eq!(second, first);
    }
}
