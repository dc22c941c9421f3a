//! Rendering of weekly report snapshots
//!
//! The HTML produced here is what the external PDF engine prints; nothing in
//! this crate produces PDF bytes itself.

use std::collections::HashMap;

use serde_json::Value;
use tera::{Context, Tera};

use crate::core::error::PedidosError;
use crate::reporting::WeeklyReport;

/// Turns a report snapshot into a document
pub trait ReportRenderer: Send + Sync {
    /// MIME type of the rendered output
    fn content_type(&self) -> &'static str;

    fn render(&self, report: &WeeklyReport) -> Result<String, PedidosError>;
}

const TEMPLATE_NAME: &str = "weekly_report.html";

const WEEKLY_REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>Reporte semanal {{ report.week }}</title>
</head>
<body>
<h1>Reporte semanal {{ report.week }}</h1>
<p>{{ report.windowStart }} &ndash; {{ report.windowEnd }} ({{ report.timezone }})</p>
<p>Pedidos: {{ report.orderCount }} &middot; Total vendido: ${{ report.revenueSum | money }}</p>

<h2>Ranking de Asesoras</h2>
<table>
<thead><tr><th>#</th><th>Asesora</th><th>Pedidos</th><th>Total Vendido</th></tr></thead>
<tbody>
{% for a in report.advisors %}<tr><td>{{ loop.index }}</td><td>{{ a.name }}</td><td>{{ a.orderCount }}</td><td>${{ a.revenueSum | money }}</td></tr>
{% endfor %}</tbody>
</table>

<h2>Mejores Clientes</h2>
<table>
<thead><tr><th>Cliente</th><th>Asesora</th><th>Pedidos</th><th>Total Comprado</th></tr></thead>
<tbody>
{% for c in report.topClients %}<tr><td>{{ c.name }}</td><td>{{ c.lastAdvisor }}</td><td>{{ c.orderCount }}</td><td>${{ c.revenueSum | money }}</td></tr>
{% endfor %}</tbody>
</table>

<h2>Pedidos Más Caros</h2>
<table>
<thead><tr><th>ID</th><th>Cliente</th><th>Asesora</th><th>Monto</th><th>Fecha</th></tr></thead>
<tbody>
{% for o in report.topOrders %}<tr><td>{{ o.id }}</td><td>{{ o.customer }}</td><td>{{ o.advisor }}</td><td>{{ o.total | money }} {{ o.currency }}</td><td>{{ o.createdAt | truncate(length=10, end="") }}</td></tr>
{% endfor %}</tbody>
</table>
</body>
</html>
"#;

/// Formats a number with two decimals
fn money(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value {
        Value::Number(n) => Ok(Value::String(format!("{:.2}", n.as_f64().unwrap_or_default()))),
        Value::String(s) => Ok(Value::String(s.clone())),
        other => Err(tera::Error::msg(format!("money: cannot format {}", other))),
    }
}

/// HTML renderer backed by an embedded tera template
pub struct HtmlReportRenderer {
    tera: Tera,
}

impl HtmlReportRenderer {
    pub fn new() -> Result<Self, PedidosError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, WEEKLY_REPORT_TEMPLATE)
            .map_err(|e| PedidosError::Render(e.to_string()))?;
        tera.register_filter("money", money);
        Ok(Self { tera })
    }
}

impl ReportRenderer for HtmlReportRenderer {
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn render(&self, report: &WeeklyReport) -> Result<String, PedidosError> {
        let mut context = Context::new();
        context.insert("report", report);
        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| PedidosError::Render(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Advisor, AdvisorRef, Channel, Currency, LineItem, Order, OrderStatus, OrderType,
    };
    use crate::reporting::IsoWeek;
    use chrono_tz::Tz;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_render_lists_rollups_and_escapes_names() {
        let advisor = Advisor {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            active: true,
        };
        let order = Order {
            id: Uuid::new_v4(),
            advisor: AdvisorRef::Linked {
                id: advisor.id,
                name: advisor.name.clone(),
            },
            client_id: None,
            customer_name: "Tienda <Sol>".to_string(),
            items: vec![LineItem::new("A", 2, Decimal::new(500, 2))],
            total: Decimal::new(1000, 2),
            order_type: OrderType::Accessories,
            channel: Channel::WhatsApp,
            currency: Currency::Usd,
            status: Some(OrderStatus::Creado),
            history: Vec::new(),
            notes: Vec::new(),
            user_id: None,
            created_at: "2024-01-02T09:30:00Z".parse().unwrap(),
        };
        let report = WeeklyReport::build(
            IsoWeek::parse("2024-W01").unwrap(),
            Tz::UTC,
            &[order],
            &[advisor],
            10,
        );

        let renderer = HtmlReportRenderer::new().unwrap();
        let html = renderer.render(&report).unwrap();

        assert!(html.contains("Reporte semanal 2024-W01"));
        assert!(html.contains("<td>Ana</td>"));
        assert!(html.contains("$10.00"));
        assert!(html.contains("Tienda &lt;Sol&gt;"));
        assert!(html.contains("2024-01-02"));
        assert_eq!(renderer.content_type(), "text/html; charset=utf-8");
    }
}
