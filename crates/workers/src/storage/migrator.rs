use sqlx::PgPool;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "000_migration_tracking.sql",
        include_str!("../../../../migrations/000_migration_tracking.sql"),
    ),
    (
        "001_create_monitors.sql",
        include_str!("../../../../migrations/001_create_monitors.sql"),
    ),
    (
        "002_create_incidents.sql",
        include_str!("../../../../migrations/002_create_incidents.sql"),
    ),
    (
        "003_create_alert_channels.sql",
        include_str!("../../../../migrations/003_create_alert_channels.sql"),
    ),
    (
        "004_create_check_results.sql",
        include_str!("../../../../migrations/004_create_check_results.sql"),
    ),
    (
        "005_create_monitor_schedules.sql",
        include_str!("../../../../migrations/005_create_monitor_schedules.sql"),
    ),
];

/// Applies every migration not yet recorded in `_migrations`, each inside its
/// own transaction, and returns the names applied by this call.
pub async fn run_migrations(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let applied = applied_migrations(pool).await?;
    let mut newly_applied = Vec::new();

    for (filename, sql) in pending(&applied) {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO _migrations (filename) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(filename)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(migration = filename, "migration applied");
        newly_applied.push(filename.to_string());
    }

    Ok(newly_applied)
}

pub async fn pending_migrations(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let applied = applied_migrations(pool).await?;
    Ok(pending(&applied)
        .map(|(name, _)| name.to_string())
        .collect())
}

async fn applied_migrations(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::raw_sql(MIGRATIONS[0].1).execute(pool).await?;
    sqlx::query_scalar("SELECT filename FROM _migrations")
        .fetch_all(pool)
        .await
}

fn pending<'a>(applied: &'a [String]) -> impl Iterator<Item = &'static (&'static str, &'static str)> + 'a {
    MIGRATIONS[1..]
        .iter()
        .filter(move |(name, _)| !applied.iter().any(|a| a == name))
}
