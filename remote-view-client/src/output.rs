use colored::*;
use std::time::Duration;

#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
    pub duration: Duration,
}

impl TestResult {
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: None,
            duration,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: Some(message.into()),
            duration,
        }
    }
}

pub fn print_test_summary(results: &[TestResult]) {
    for result in results {
        let status = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!("[{}] {} ({:?})", status, result.name, result.duration);
        if let Some(message) = &result.message {
            println!("       {}", message.dimmed());
        }
    }

    let passed = results.iter().filter(|r| r.passed).count();
    println!("\n{}/{} scenarios passed", passed, results.len());
}
