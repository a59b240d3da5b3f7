// user-locale - Build Task Runner
// cargo xtask pattern for the workspace

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use xshell::{Shell, cmd};

fn main() -> Result<()> {
    let sh = Shell::new()?;
    let args: Vec<_> = std::env::args().skip(1).collect();

    match args.first().map(|s| s.as_str()) {
        Some("build") => build(&sh, args.iter().any(|a| a == "--release")),
        Some("test") => test(&sh),
        Some("format") => format(&sh, args.iter().any(|a| a == "--check")),
        Some("clippy") => clippy(&sh),
        Some("run") => run(&sh, &args[1..]),
        Some("clean") => clean(&sh),
        Some("coverage") => coverage(&sh),
        Some("ci") => ci(&sh),
        Some("dist") => dist(&sh),
        Some(other) => {
            print_help();
            bail!("unknown command: {}", other)
        },
        None => {
            print_help();
            Ok(())
        },
    }
}

fn print_help() {
    println!("user-locale - Build Commands:");
    println!();
    println!("Usage: cargo xtask <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  build [--release]   Build the workspace");
    println!("  test                Run all tests");
    println!("  format [--check]    Format code (check mode doesn't modify)");
    println!("  clippy              Run clippy checks");
    println!("  run [ARGS...]       Run the demo server");
    println!("  clean               Clean build artifacts");
    println!("  coverage            Generate test coverage report");
    println!("  ci                  Run all CI checks (format + clippy + build + test)");
    println!("  dist                Create distribution package (tar.gz)");
}

fn build(sh: &Shell, release: bool) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    if release {
        cmd!(sh, "cargo build --workspace --release")
            .run()
            .context("Failed to build in release mode")?;
    } else {
        cmd!(sh, "cargo build --workspace")
            .run()
            .context("Failed to build")?;
    }

    println!("✅ Build complete");
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    cmd!(sh, "cargo test --workspace")
        .run()
        .context("Tests failed")?;

    println!("✅ All tests passed!");
    Ok(())
}

fn format(sh: &Shell, check: bool) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    if check {
        cmd!(sh, "cargo fmt --all -- --check")
            .run()
            .context("Rust code is not formatted")?;
        println!("✅ Rust code is properly formatted");
    } else {
        cmd!(sh, "cargo fmt --all")
            .run()
            .context("Failed to format Rust code")?;
        println!("✅ Rust code formatted");
    }

    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    cmd!(sh, "cargo clippy --workspace --all-targets -- --deny warnings")
        .run()
        .context("Clippy checks failed")?;

    Ok(())
}

/// Run the demo server, forwarding extra arguments
fn run(sh: &Shell, args: &[String]) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    cmd!(sh, "cargo run -p user-locale --bin user-locale -- {args...}")
        .run()
        .context("Failed to run demo server")?;

    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    let project = project_root();
    let _dir = sh.push_dir(&project);

    cmd!(sh, "cargo clean").run()?;

    let build_dir = project.join("build");
    if build_dir.exists() {
        sh.remove_path(&build_dir)?;
    }

    println!("✅ Clean complete!");
    Ok(())
}

fn coverage(sh: &Shell) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    if cmd!(sh, "cargo tarpaulin --version").quiet().ignore_stdout().run().is_err() {
        println!("⚠️  cargo-tarpaulin not found. Installing...");
        cmd!(sh, "cargo install cargo-tarpaulin")
            .run()
            .context("Failed to install cargo-tarpaulin")?;
    }

    cmd!(sh, "cargo tarpaulin --workspace --exclude xtask --out Html --out Xml --output-dir build/coverage")
        .run()
        .context("Failed to generate coverage report")?;

    println!("✅ Coverage report: build/coverage/index.html");
    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    println!("📝 [1/4] Checking code format...");
    format(sh, true)?;

    println!("🔍 [2/4] Running clippy checks...");
    clippy(sh)?;

    println!("🔨 [3/4] Building project...");
    build(sh, true)?;

    println!("🧪 [4/4] Running tests...");
    test(sh)?;

    println!("🎉 CI pipeline completed successfully!");
    Ok(())
}

/// Package the demo binary with its config into build/dist
fn dist(sh: &Shell) -> Result<()> {
    build(sh, true)?;

    let project = project_root();
    let stage = project.join("build/dist/user-locale");
    sh.create_dir(stage.join("bin"))?;
    sh.create_dir(stage.join("conf"))?;

    sh.copy_file(project.join("target/release/user-locale"), stage.join("bin"))?;
    sh.copy_file(project.join("user-locale/conf/config.toml"), stage.join("conf"))?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let package_name = format!("user-locale-{}.tar.gz", timestamp);

    let _dir = sh.push_dir(project.join("build/dist"));
    cmd!(sh, "tar czf {package_name} user-locale")
        .run()
        .context("Failed to create tarball")?;

    println!("✅ Distribution package: build/dist/{}", package_name);
    Ok(())
}

fn project_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap_or(manifest_dir).to_path_buf()
}
