//! CLI Status Command
//!
//! Queries a running gateway's health endpoint.

use anyhow::Result;
use serde_json::Value;

pub async fn run(port: u16) -> Result<()> {
    println!("\n📊 schedai status\n");

    let url = format!("http://127.0.0.1:{port}/api/health");
    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            let body: Value = resp.json().await?;
            print!("{}", format_health(&body));
        }
        Ok(resp) => println!("Gateway on port {port} answered {}", resp.status()),
        Err(_) => println!("schedai is not running on port {port}"),
    }
    Ok(())
}

fn format_health(body: &Value) -> String {
    let field = |key: &str| match &body[key] {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    };
    format!(
        "Service:  {} {}\nStatus:   {}\nModel:    {}\nSessions: {}\nUptime:   {}s\n",
        field("service"),
        field("version"),
        field("status"),
        field("model"),
        field("sessions"),
        field("uptime_seconds"),
    )
}
