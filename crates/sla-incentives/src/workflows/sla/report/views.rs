use super::super::engine::DataQuality;
use super::super::scoring::MonthlyAdjustment;
use crate::workflows::bonus::SweepPoint;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat aggregate written once per site per run. Key names are the ones the
/// dashboard and gauge renderer read, so they stay as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaAggregateRecord {
    pub site: String,
    pub period: String,
    pub generated_at: NaiveDateTime,
    #[serde(rename = "hora_agora")]
    pub generated_clock: String,

    #[serde(rename = "sla_semana_1")]
    pub shipping_week_1: String,
    #[serde(rename = "sla_semana_2")]
    pub shipping_week_2: String,
    #[serde(rename = "sla_semana_3")]
    pub shipping_week_3: String,
    #[serde(rename = "sla_semana_4")]
    pub shipping_week_4: String,
    #[serde(rename = "sla_porcent")]
    pub shipping_total: String,

    #[serde(rename = "sla_recibo_1")]
    pub receiving_week_1: String,
    #[serde(rename = "sla_recibo_2")]
    pub receiving_week_2: String,
    #[serde(rename = "sla_recibo_3")]
    pub receiving_week_3: String,
    #[serde(rename = "sla_recibo_4")]
    pub receiving_week_4: String,
    #[serde(rename = "sla_recibos_total")]
    pub receiving_total: String,

    #[serde(rename = "sla_picking_semana_1")]
    pub picking_week_1: String,
    #[serde(rename = "sla_picking_semana_2")]
    pub picking_week_2: String,
    #[serde(rename = "sla_picking_semana_3")]
    pub picking_week_3: String,
    #[serde(rename = "sla_picking_semana_4")]
    pub picking_week_4: String,
    #[serde(rename = "sla_picking_total")]
    pub picking_total: String,

    #[serde(rename = "s1_total")]
    pub composite_week_1: String,
    #[serde(rename = "s2_total")]
    pub composite_week_2: String,
    #[serde(rename = "s3_total")]
    pub composite_week_3: String,
    #[serde(rename = "s4_total")]
    pub composite_week_4: String,
    #[serde(rename = "sla_mes")]
    pub composite_month: String,

    #[serde(rename = "total_s1_circulo")]
    pub composite_week_1_gauge: String,
    #[serde(rename = "total_s2_circulo")]
    pub composite_week_2_gauge: String,
    #[serde(rename = "total_s3_circulo")]
    pub composite_week_3_gauge: String,
    #[serde(rename = "total_s4_circulo")]
    pub composite_week_4_gauge: String,
    #[serde(rename = "sla_total_circulo")]
    pub composite_month_gauge: String,
    #[serde(rename = "sla_total_ci_circulo")]
    pub receiving_total_gauge: String,
    #[serde(rename = "sla_total_pi_circulo")]
    pub picking_total_gauge: String,
    #[serde(rename = "sla_total_pa_circulo")]
    pub shipping_total_gauge: String,

    #[serde(flatten)]
    pub adjustment: MonthlyAdjustment,

    #[serde(rename = "bonus_valido")]
    pub bonus_eligible: bool,
    #[serde(rename = "valor_bonus")]
    pub bonus_unit_value: f64,
    #[serde(rename = "bonus_total")]
    pub bonus_amount: f64,
    #[serde(rename = "multiplicador_bonus_sla")]
    pub bonus_factor: f64,
    #[serde(rename = "nivel_de_bonus")]
    pub bonus_level: String,
    #[serde(rename = "porcentagem_da_barra_sla")]
    pub sla_progress: Option<f64>,
    #[serde(rename = "phd_bonus_values")]
    pub bonus_sweep: Vec<SweepPoint>,

    #[serde(rename = "media")]
    pub throughput_average: Option<f64>,
    #[serde(rename = "phd_per_day")]
    pub throughput_per_day: BTreeMap<String, f64>,
    #[serde(rename = "envios_mes")]
    pub shipped_month: u64,
    #[serde(rename = "envios_dia")]
    pub shipped_today: u64,
    #[serde(rename = "pedidos_pendentes")]
    pub outstanding_orders: u64,

    pub data_quality: DataQuality,
}
