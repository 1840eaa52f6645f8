use crate::commands::CommandResult;
use ticketry_core::config::{AppConfig, LoadOptions};
use ticketry_db::{connect, reporting};

pub fn run(csv: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "report",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "report",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let output = if csv {
            reporting::export_requests_csv(&pool)
                .await
                .map_err(|error| ("report_query", error.to_string(), 5u8))?
        } else {
            render_summary(&pool)
                .await
                .map_err(|error| ("report_query", error.to_string(), 5u8))?
        };
        pool.close().await;
        Ok::<String, (&'static str, String, u8)>(output)
    });

    match result {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("report", error_class, message, exit_code)
        }
    }
}

async fn render_summary(
    pool: &ticketry_db::DbPool,
) -> Result<String, ticketry_db::repositories::RepositoryError> {
    let statuses = reporting::status_summary(pool).await?;
    let categories = reporting::category_summary(pool).await?;

    let mut lines = vec!["requests by status:".to_string()];
    if statuses.is_empty() {
        lines.push("  (none)".to_string());
    }
    for bucket in &statuses {
        lines.push(format!("  {:<20} {}", bucket.status.label(), bucket.count));
    }

    lines.push("requests by category:".to_string());
    if categories.is_empty() {
        lines.push("  (none)".to_string());
    }
    for bucket in &categories {
        lines.push(format!("  {:<20} {}", bucket.category, bucket.count));
    }

    Ok(lines.join("\n"))
}
