//! `bertrand onboard`: first-time setup.

use bertrand_config::AppConfig;

use super::GlobalArgs;

pub async fn run(global: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = global.config_path();

    println!("📈 Bertrand First-Time Setup");
    println!("=========================\n");

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        } else {
            println!("  Config directory exists: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Edit {} and add your API key", config_path.display());
    println!("   2. Try a short run: bertrand test --periods 5");
    println!("   3. Launch the sweep: bertrand experiment\n");

    Ok(())
}
