use serde::Serialize;
use serde_json::Value;

use super::Review;
use crate::extraction::{InvoiceExtraction, MediaPlanExtraction, PoExtraction};
use crate::validator::ValidationResult;

/// Projects the validator verdict and the three extraction results onto a
/// review record.
///
/// Each field reads from exactly one source, except the invoice total which
/// may be derived from the media plan components when no invoice total was
/// extracted.
pub fn reconcile(
    validation: &ValidationResult,
    invoices: &InvoiceExtraction,
    po: &PoExtraction,
    media_plan: &MediaPlanExtraction,
) -> Review {
    let plan = media_plan.details.clone().unwrap_or_default();

    let agency_invoice_total_amount = invoices.total_amount().or_else(|| {
        derive_total(
            plan.net_media_cost,
            plan.agency_fees,
            plan.taxes_amount,
            plan.third_party_cost,
        )
    });

    Review {
        market_bu: plan.market_type.map(|m| m.as_str().to_string()),
        agency_invoice_number: invoices
            .summary
            .as_ref()
            .map(|s| s.agency_invoice_details.clone()),
        po_number: po.po_number.clone(),
        period_month: plan.period_month,

        medium: plan.medium,
        campaign_name: invoices.first_campaign_name().map(str::to_string),

        net_media_cost: plan.net_media_cost,
        agency_fee: plan.agency_fees,
        taxes: plan.taxes_amount,
        other_third_party_cost: plan.third_party_cost,
        agency_invoice_total_amount,
        media_plan_total_amount: plan.media_plan_total_amount,
        po_amount_with_af: po.po_amount,

        initial_review_outcome: Some(validation.initial_review_outcome.clone()),
        final_review_outcome: Some(validation.final_review_outcome),

        raw_invoice_output: raw(invoices),
        raw_po_output: raw(po),
        raw_media_plan_output: raw(media_plan),

        ..Review::default()
    }
}

/// `net + fee + taxes + third_party`, with third party defaulting to 0.
///
/// Returns `None` unless the three required components are present and
/// finite.
pub fn derive_total(
    net_media_cost: Option<f64>,
    agency_fee: Option<f64>,
    taxes: Option<f64>,
    third_party_cost: Option<f64>,
) -> Option<f64> {
    let components = [net_media_cost?, agency_fee?, taxes?];
    if !components.iter().all(|v| v.is_finite()) {
        return None;
    }

    let third_party = third_party_cost.filter(|v| v.is_finite()).unwrap_or(0.0);
    Some(components.iter().sum::<f64>() + third_party)
}

fn raw<T: Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize extraction output for audit");
            None
        }
    }
}
