//! Plain-text rendering of the dashboard views.

use std::collections::BTreeMap;

use agentmeter_core::analytics::{DashboardData, SessionDetail, TimelineEntry};
use agentmeter_core::catalog::{agent_meta, quota_usage, BillingType};
use agentmeter_core::format::{
    format_cost, format_duration_ms, format_number, format_percent, format_relative_time,
    format_reset_countdown, format_tokens, format_window_label,
};
use agentmeter_core::usage::UsageWindow;
use agentmeter_core::{ProviderCatalog, UsageSnapshot};
use chrono::{Duration, NaiveDate, Utc};

/// Root sessions listed on the dashboard.
const SESSION_ROWS: usize = 10;

/// Intensity ramp for the hourly heatmap, empty to busiest.
const HEAT: [char; 5] = ['.', '░', '▒', '▓', '█'];

pub fn print_dashboard(data: &DashboardData, catalog: &ProviderCatalog) {
    let t = &data.totals;
    println!("agentmeter");
    println!();
    println!(
        "  Cost        {:>10}   billing {:>10}   subscription {:>10}",
        format_cost(t.cost),
        format_cost(t.billing_cost),
        format_cost(t.subscription_cost)
    );
    println!(
        "  Today       {:>10}   week    {:>10}   month        {:>10}",
        format_cost(t.today_billing_cost),
        format_cost(t.week_billing_cost),
        format_cost(t.month_billing_cost)
    );
    println!(
        "  Last 5h     {:>10}   {} messages",
        format_cost(t.five_hour_cost),
        format_number(t.five_hour_messages)
    );
    println!(
        "  Messages    {:>10}   tokens  {:>10}   active sessions {}",
        format_number(t.messages),
        format_tokens(t.tokens.total),
        t.sessions
    );

    if let Some(usage) = &data.codex_usage {
        println!();
        print_usage_summary(usage);
    }

    if data.agents.is_empty() && data.sessions.is_empty() {
        println!();
        println!("No OpenCode activity found.");
        return;
    }

    println!();
    println!("Agents");
    println!(
        "  {:<22} {:>10} {:>8} {:>10} {:>8} {:>9}",
        "agent", "cost", "msgs", "avg/msg", "cache", "resp"
    );
    for agent in &data.agents {
        let meta = agent_meta(&agent.agent);
        let cost = if agent.has_billing_provider {
            format_cost(agent.billing_cost)
        } else {
            "-".to_string()
        };
        println!(
            "  {} {:<20} {:>10} {:>8} {:>10} {:>8} {:>9}",
            meta.emoji,
            meta.label,
            cost,
            format_number(agent.message_count),
            format_cost(agent.avg_cost_per_message),
            format_percent(agent.cache_hit_rate),
            format_duration_ms(agent.avg_response_time.round() as i64)
        );
    }

    println!();
    println!("Providers");
    for provider in &data.providers {
        let meta = catalog.meta(&provider.provider);
        let spend = match meta.billing_type {
            BillingType::Billing => format_cost(provider.total_cost),
            BillingType::Account => "account".to_string(),
        };
        let mut line = format!(
            "  {:<18} {:>10} {:>8} msgs {:>9} tokens",
            meta.name,
            spend,
            format_number(provider.total_messages),
            format_tokens(provider.total_tokens)
        );
        if let Some(quota) = quota_usage(catalog, provider) {
            if let Some(daily) = quota.daily {
                line.push_str(&format!("  day {}", format_percent(daily)));
            }
            if let Some(weekly) = quota.weekly {
                line.push_str(&format!("  week {}", format_percent(weekly)));
            }
        }
        println!("{}", line);
    }

    println!();
    println!("Recent sessions");
    let now = Utc::now();
    for session in data.sessions.iter().take(SESSION_ROWS) {
        let short_id: String = session.id.chars().take(12).collect();
        let agent = session
            .top_agent()
            .map(|a| agent_meta(a).label)
            .unwrap_or_else(|| "-".to_string());
        let children = if session.children.is_empty() {
            String::new()
        } else {
            format!(" (+{} sub)", session.children.len())
        };
        println!(
            "  {:<12} {:<32} {:>10} {:>6} msgs  {:<12} {}{}",
            short_id,
            truncate(&session.title, 32),
            format_cost(session.billing_cost),
            session.message_count,
            agent,
            format_relative_time(session.updated_at, now),
            children
        );
    }
    if data.sessions.len() > SESSION_ROWS {
        println!("  ... and {} more", data.sessions.len() - SESSION_ROWS);
    }
}

pub fn print_session(detail: &SessionDetail, catalog: &ProviderCatalog) {
    println!("{}", detail.title);
    println!("  {}  {}", detail.id, detail.directory);
    println!();
    if detail.billing_cost > 0.0 {
        println!("  Session cost  {}", format_cost(detail.billing_cost));
    }
    println!("  Messages      {}", format_number(detail.message_count));
    println!(
        "  Tokens        {} in / {} out",
        format_tokens(detail.input_tokens),
        format_tokens(detail.output_tokens)
    );
    println!("  Duration      {}", format_duration_ms(detail.duration));

    if detail.providers.is_empty() {
        println!();
        println!("No billable messages in this session.");
        return;
    }

    println!();
    println!("Providers");
    for provider in &detail.providers {
        let meta = catalog.meta(&provider.provider);
        let spend = if provider.billing {
            format_cost(provider.cost)
        } else {
            "account-based".to_string()
        };
        println!(
            "  {} {:<16} {:>14}  {} messages, {} tokens",
            meta.icon,
            meta.name,
            spend,
            format_number(provider.messages),
            format_tokens(provider.tokens)
        );
        let models: Vec<&str> = provider
            .models
            .iter()
            .map(|m| meta.model_name(m))
            .collect();
        println!("      models: {}", models.join(", "));
        for (agent, usage) in &provider.agents {
            let meta = agent_meta(agent);
            println!(
                "      {} {:<18} {:>6} msgs {:>9} tokens",
                meta.emoji,
                meta.label,
                usage.messages,
                format_tokens(usage.tokens)
            );
        }
    }

    println!();
    println!("Agents");
    for agent in &detail.agents {
        let meta = agent_meta(&agent.agent);
        println!(
            "  {} {:<18} {:<12} {:>10} {:>6} msgs",
            meta.emoji,
            meta.label,
            meta.role,
            format_cost(agent.cost),
            agent.messages
        );
    }
}

pub fn print_timeline(entries: &[TimelineEntry], days: u32, today: NaiveDate) {
    let first = today - Duration::days(i64::from(days) - 1);

    let mut by_day: BTreeMap<NaiveDate, ([u64; 24], f64)> = BTreeMap::new();
    for entry in entries {
        let Ok(date) = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d") else {
            continue;
        };
        if date < first || date > today {
            continue;
        }
        let (hours, cost) = by_day.entry(date).or_insert(([0; 24], 0.0));
        if let Some(slot) = hours.get_mut(entry.hour as usize) {
            *slot += entry.messages;
        }
        *cost += entry.cost;
    }

    let busiest = by_day
        .values()
        .flat_map(|(hours, _)| hours.iter().copied())
        .max()
        .unwrap_or(0);

    println!("{:<10}  {:<24}  {:>6} {:>10}", "date", "00h         12h     23h", "msgs", "cost");
    let mut date = first;
    while date <= today {
        let (hours, cost) = by_day.get(&date).copied().unwrap_or(([0; 24], 0.0));
        let heat: String = hours.iter().map(|&n| heat_cell(n, busiest)).collect();
        let messages: u64 = hours.iter().sum();
        println!(
            "{}  {}  {:>6} {:>10}",
            date.format("%Y-%m-%d"),
            heat,
            format_number(messages),
            format_cost(cost)
        );
        date += Duration::days(1);
    }
}

pub fn print_usage(usage: Option<&UsageSnapshot>) {
    match usage {
        Some(usage) => print_usage_summary(usage),
        None => println!("Codex usage unavailable (no token, disabled, or endpoint unreachable)."),
    }
}

fn print_usage_summary(usage: &UsageSnapshot) {
    let status = if usage.limit_reached {
        "limit reached"
    } else if usage.allowed {
        "ok"
    } else {
        "blocked"
    };
    println!("Codex ({} plan): {}", usage.plan_type, status);
    print_window("primary", usage.primary_window.as_ref());
    print_window("secondary", usage.secondary_window.as_ref());
    for limit in &usage.additional_limits {
        println!(
            "  {}{}",
            limit.limit_name,
            if limit.limit_reached { " (limit reached)" } else { "" }
        );
        print_window("primary", limit.primary_window.as_ref());
        print_window("secondary", limit.secondary_window.as_ref());
    }
}

fn print_window(name: &str, window: Option<&UsageWindow>) {
    if let Some(w) = window {
        println!(
            "    {:<9} {:>7} {:>6.1}% used, resets in {}",
            name,
            format_window_label(w.window_seconds),
            w.used_percent,
            format_reset_countdown(w.reset_after_seconds)
        );
    }
}

fn heat_cell(messages: u64, busiest: u64) -> char {
    if messages == 0 || busiest == 0 {
        return HEAT[0];
    }
    let levels = (HEAT.len() - 1) as u64;
    let level = ((messages * levels + busiest - 1) / busiest).clamp(1, levels);
    HEAT[level as usize]
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heat_cell_scale() {
        assert_eq!(heat_cell(0, 10), '.');
        assert_eq!(heat_cell(1, 10), '░');
        assert_eq!(heat_cell(10, 10), '█');
        assert_eq!(heat_cell(5, 0), '.');
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 8), "a much …");
    }
}
