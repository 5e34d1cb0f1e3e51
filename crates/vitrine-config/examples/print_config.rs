/// Example program to print the loaded configuration
///
/// Run with: cargo run -p vitrine-config --example print_config

fn main() {
    let config = vitrine_config::VitrineConfig::load();

    println!("=== Vitrine Configuration ===\n");

    println!("Rotator Settings:");
    println!("  Interval: {}ms", config.rotator.interval_ms);
    println!("  Suppress Window: {}ms", config.rotator.suppress_window_ms);
    println!("  Resume Quiet: {}ms", config.rotator.resume_quiet_ms);
    println!("  Auto Start: {}", config.rotator.auto_start);
    println!();

    println!("Reveal Settings:");
    println!("  Threshold: {}", config.reveal.threshold);
    println!("  Stagger: {}ms", config.reveal.stagger_ms);
    println!();

    println!("Metrics Settings:");
    println!(
        "  Memory Sample Interval: {}ms",
        config.metrics.memory_sample_interval_ms
    );
    println!();

    if let Err(e) = config.validate() {
        eprintln!("Configuration is invalid: {}", e);
    }

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
