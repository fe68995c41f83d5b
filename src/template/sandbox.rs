//! Call-scoped artifact access for template runtimes
//!
//! Templates never touch the real filesystem. Every lookup a template can
//! make (Jinja `include`/`import`, Lua `require`/`loadfile`/`dofile`) is
//! answered from the [`ImportMap`] of the expansion that is running. The map
//! is handed to each runtime instance directly, so concurrent expansions
//! with different imports cannot observe each other's artifacts.

use minijinja::{AutoEscape, Environment};
use mlua::{Lua, LuaOptions, MultiValue, StdLib, Table, Value};

use super::registry::ImportMap;

/// Standard libraries available to scripted templates
pub fn script_stdlib() -> StdLib {
    StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::PACKAGE
}

/// A Jinja environment whose loader resolves names only against `imports`
pub fn jinja_environment(imports: &ImportMap) -> Environment<'static> {
    let mut env = Environment::new();
    // Output is YAML, never markup, whatever the template is called
    env.set_auto_escape_callback(|_| AutoEscape::None);
    let artifacts = imports.clone();
    env.set_loader(move |name| Ok(artifacts.get(name).map(str::to_string)));
    env
}

/// A fresh Lua state with artifact access redirected to `imports`
pub fn lua_state(imports: &ImportMap) -> mlua::Result<Lua> {
    let lua = Lua::new_with(script_stdlib(), LuaOptions::default())?;
    install_artifact_access(&lua, imports)?;
    install_print(&lua)?;
    Ok(lua)
}

/// Map a `require` module name to its artifact name (`a.b` -> `a/b.lua`)
pub fn module_artifact(module: &str) -> String {
    if module.ends_with(".lua") {
        module.to_string()
    } else {
        format!("{}.lua", module.replace('.', "/"))
    }
}

fn install_artifact_access(lua: &Lua, imports: &ImportMap) -> mlua::Result<()> {
    let globals = lua.globals();

    let package: Table = globals.get("package")?;
    package.set("path", "")?;
    package.set("cpath", "")?;
    package.set("loadlib", Value::Nil)?;

    let artifacts = imports.clone();
    let searcher = lua.create_function(move |lua, module: String| {
        let name = module_artifact(&module);
        match artifacts.get(&name) {
            Some(source) => {
                let loader = lua.load(source).set_name(format!("@{}", name)).into_function()?;
                Ok((
                    Value::Function(loader),
                    Value::String(lua.create_string(&name)?),
                ))
            }
            None => Ok((
                Value::String(lua.create_string(format!("no import '{}'", name))?),
                Value::Nil,
            )),
        }
    })?;
    package.set("searchers", lua.create_sequence_from([searcher])?)?;

    let artifacts = imports.clone();
    let loadfile = lua.create_function(move |lua, name: String| match artifacts.get(&name) {
        Some(source) => {
            let chunk = lua.load(source).set_name(format!("@{}", name)).into_function()?;
            Ok((Value::Function(chunk), Value::Nil))
        }
        None => Ok((
            Value::Nil,
            Value::String(lua.create_string(format!("cannot open {}", name))?),
        )),
    })?;
    globals.set("loadfile", loadfile)?;

    let artifacts = imports.clone();
    let dofile = lua.create_function(move |lua, name: String| {
        let source = artifacts
            .get(&name)
            .ok_or_else(|| mlua::Error::runtime(format!("cannot open {}", name)))?;
        lua.load(source)
            .set_name(format!("@{}", name))
            .call::<MultiValue>(())
    })?;
    globals.set("dofile", dofile)?;

    Ok(())
}

/// Route `print` to the log so stdout only ever carries the expanded document
fn install_print(lua: &Lua) -> mlua::Result<()> {
    let print = lua.create_function(|_, args: MultiValue| {
        let line = args
            .iter()
            .map(|v| v.to_string().unwrap_or_else(|_| v.type_name().to_string()))
            .collect::<Vec<_>>()
            .join("\t");
        tracing::info!(target: "expandybird::script", "{}", line);
        Ok(())
    })?;
    lua.globals().set("print", print)
}
