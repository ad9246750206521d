use std::path::PathBuf;
use std::time::Duration;

use console::Style;
use livestack_core::pipeline::config::PipelineConfig;
use livestack_core::stack::StackSummary;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    role: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            role: Style::new().green(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_ingest_summary(
    config: &PipelineConfig,
    submitted: usize,
    previews: &[PathBuf],
    elapsed: Duration,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Live Stack"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(10)));
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Storage"),
        s.path.apply_to(config.storage_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Previews"),
        s.path.apply_to(config.output_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Submitted"),
        s.value.apply_to(submitted)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.1}s", elapsed.as_secs_f64()))
    );

    if !previews.is_empty() {
        println!();
        for path in previews {
            println!("  {:<14}{}", s.label.apply_to("Updated"), s.path.apply_to(path.display()));
        }
    }
    println!();
}

pub fn print_stack_table(stacks: &[StackSummary]) {
    let s = Styles::new();

    println!();
    println!(
        "  {:<7}{:>7}  {:>11}  {}",
        s.label.apply_to("Role"),
        s.label.apply_to("Count"),
        s.label.apply_to("Size"),
        s.label.apply_to("Key")
    );
    for stack in stacks {
        println!(
            "  {:<7}{:>7}  {:>11}  {}",
            s.role.apply_to(stack.role),
            s.value.apply_to(stack.count),
            format!("{}x{}", stack.width, stack.height),
            stack.key
        );
    }
    println!();
}
