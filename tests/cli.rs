use assert_cmd::Command;
use predicates::prelude::*;
use std::{fs, path::Path};
use tempfile::{TempDir, tempdir};

fn guest(source: &str) -> TempDir {
    let dir = tempdir().expect("create temp dir");
    fs::write(dir.path().join("shinec.lua"), source).expect("write guest module");
    dir
}

fn host(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shinec").expect("binary exists");
    cmd.current_dir(dir)
        .env_remove("LUA_PATH")
        .env_remove("SHINEC_PATH")
        .env_remove("SHINEC_LOG");
    cmd
}

#[test]
fn start_returning_exits_cleanly() {
    let dir = guest("return { start = function() end }");
    host(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn guest_sees_sentinel_and_arguments_in_order() {
    let dir = guest(
        r#"
        return {
            start = function()
                io.write(arg[0], "|", #arg, "|", table.concat(arg, ","))
            end,
        }
        "#,
    );
    host(dir.path())
        .args(["alpha", "", "--beta"])
        .assert()
        .success()
        .stdout("shinec|3|alpha,,--beta");
}

#[test]
fn arguments_are_visible_while_the_module_loads() {
    let dir = guest(
        r#"
        local first = arg[1]
        return { start = function() io.write(first) end }
        "#,
    );
    host(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout("--help");
}

#[test]
fn load_error_is_reported_with_prefix() {
    let dir = guest(r#"error("boom", 0)"#);
    host(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error: boom"));
}

#[test]
fn load_error_carries_a_traceback() {
    let dir = guest(r#"error("boom")"#);
    host(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error: "))
        .stderr(predicate::str::contains("boom"))
        .stderr(predicate::str::contains("stack traceback:"));
}

#[test]
fn load_error_without_debug_library_is_unenriched() {
    let dir = guest(
        r#"
        debug = nil
        error("boom", 0)
        "#,
    );
    host(dir.path())
        .assert()
        .code(1)
        .stderr("Error: boom\n");
}

#[test]
fn finalizer_output_follows_the_error_line() {
    let dir = guest(
        r#"
        closing = newproxy(true)
        getmetatable(closing).__gc = function() io.stderr:write("closing\n") end
        debug = nil
        error("boom", 0)
        "#,
    );
    host(dir.path())
        .assert()
        .code(1)
        .stderr("Error: boom\nclosing\n");
}

#[test]
fn missing_guest_module_fails() {
    let dir = tempdir().expect("create temp dir");
    host(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with(
            "Error: module 'shinec' not found",
        ));
}

#[test]
fn native_lpeg_module_is_preloaded() {
    let dir = guest(
        r#"
        local lpeg = require "lpeg"
        return {
            start = function()
                local word = lpeg.C(lpeg.R("az") ^ 1)
                io.write(lpeg.match(word, "hello world"))
            end,
        }
        "#,
    );
    host(dir.path()).assert().success().stdout("hello");
}

#[test]
fn lpeg_is_not_a_global_until_required() {
    let dir = guest(
        r#"
        return { start = function() io.write(tostring(rawget(_G, "lpeg"))) end }
        "#,
    );
    host(dir.path()).assert().success().stdout("nil");
}

#[test]
fn missing_start_is_an_unhandled_failure() {
    let dir = guest("return {}");
    host(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "attempt to call a nil value (field 'start')",
        ));
}

#[test]
fn start_failure_propagates() {
    let dir = guest(
        r#"
        return { start = function() error("kaboom", 0) end }
        "#,
    );
    host(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("kaboom"));
}

#[test]
fn module_directories_come_from_the_environment() {
    let dir = tempdir().expect("create temp dir");
    let modules = dir.path().join("guest");
    fs::create_dir_all(&modules).expect("create module dir");
    fs::write(
        modules.join("shinec.lua"),
        r#"return { start = function() io.write("found") end }"#,
    )
    .expect("write guest module");

    host(dir.path())
        .env("SHINEC_PATH", &modules)
        .assert()
        .success()
        .stdout("found");
}
