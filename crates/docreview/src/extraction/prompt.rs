//! Prompt construction for the extraction gateway.
//!
//! Filenames and document text are untrusted; both are sanitized and the
//! document body is truncated before being embedded.

/// Neutralizes chat-template control sequences in untrusted input.
pub fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|", "< |")
        .replace("|>", "| >")
        .replace("<s>", "< s >")
        .replace("</s>", "< / s >")
        .replace("[INST]", "[ INST ]")
        .replace("[/INST]", "[ / INST ]")
        .replace("<<SYS>>", "< < SYS > >")
        .replace("<</SYS>>", "< < / SYS > >")
        .replace("---", "- - -")
}

/// Sanitizes and truncates a document body to at most `max_chars` characters.
pub fn document_body(text: &str, max_chars: usize) -> String {
    sanitize_for_prompt(text).chars().take(max_chars).collect()
}

pub fn invoice(file_name: &str, text: &str, max_chars: usize) -> String {
    let file_name = sanitize_for_prompt(file_name);
    format!(
        r#"Extract the following details from the agency invoice text below. The original invoice file name is '{file_name}'.

Return the agency invoice number, the project code, the campaign name and the invoice total amount.

The invoice percentage MUST be one of: 20%, 30% or 50%. Resolve it in this order:
1. Look for '20%', '30%' or '50%' in the file name '{file_name}'. If found, use it.
2. Otherwise search the invoice text for '20%', '30%' or '50%'.
If neither contains one of these values, omit the percentage.

Invoice text:
---
{body}
---"#,
        file_name = file_name,
        body = document_body(text, max_chars),
    )
}

pub fn job_order(file_name: &str, text: &str, max_chars: usize) -> String {
    format!(
        r#"Analyze the following text from a Job Order document (also called a Purchase Order or PO). The original file name was '{file_name}'.

Extract:
1. PO Number: the purchase order identifier. It may be labeled "PO Number", "Job Order #", "PO #" or similar.
2. PO Amount: the total value of the order. Look for "Total Amount", "Grand Total" or "PO Amount".

Document text:
---
{body}
---"#,
        file_name = sanitize_for_prompt(file_name),
        body = document_body(text, max_chars),
    )
}

pub fn media_plan(file_name: &str, table_text: &str, max_chars: usize) -> String {
    format!(
        r#"You are extracting figures from a spreadsheet media plan. The original file name is '{file_name}'.
Each row is on its own line and columns are separated by tabs.

---
{body}
---

All numbers must be reported exactly as they appear or as their exact sum. Do not round.

Extract:
- medium: media types that have a nonzero cost, comma-separated (e.g. 'Digital, TV, Print').
- net_media_cost: the sum of the 'Net Media Cost' column.
- agency_fees: the sum of the 'Agency Fee' column.
- taxes_amount: the total taxes, labelled 'Vat Ksa' or 'KSA VAT'.
- third_party_cost: 'Other 3rd Party Fee/Cost' or similar; 0 when absent.
- media_plan_total_amount: 'Total Payable (including agency fees)' or the grand total.
- market_type: from the geo-targeting column, one of 'A/E', 'APAC', 'DOMESTIC', 'COE', 'MEA'. Use 'DOMESTIC' when Saudi Arabia or KSA is mentioned.
- period_month: the billing period near the top of the sheet (e.g. 'Sep 2024 - Apr 2025')."#,
        file_name = sanitize_for_prompt(file_name),
        body = document_body(table_text, max_chars),
    )
}

/// Classification prompt for choosing among same-typed candidates. Only
/// filenames are sent.
pub fn media_plan_candidates(names: &[String]) -> String {
    let listing: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}: {}", i, sanitize_for_prompt(name)))
        .collect();

    format!(
        r#"The following spreadsheet files are all media plans for the same job. One is the plan approved before the campaign, another is the actualized plan issued after the job was completed.

Files:
{files}

Return the zero-based index of the actualized (after-job) media plan as selected_index, with a short reason."#,
        files = listing.join("\n"),
    )
}
