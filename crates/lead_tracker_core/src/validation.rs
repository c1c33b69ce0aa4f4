//! crates/lead_tracker_core/src/validation.rs
//!
//! Input checks shared by the auth service and the lead repository.

use crate::domain::{Lead, LeadForm};
use crate::ports::{PortError, PortResult};
use regex::Regex;
use std::sync::OnceLock;

/// Minimum password length accepted by the mock login.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9\s\-()]{8,20}$").expect("valid phone regex"))
}

pub fn validate_email(email: &str) -> bool {
    email_regex().is_match(email)
}

pub fn validate_password(password: &str, min_len: usize) -> bool {
    password.chars().count() >= min_len
}

pub fn validate_phone(phone: &str) -> bool {
    phone_regex().is_match(phone)
}

/// Trims and HTML-escapes a value before it is shown back to the user.
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Checks the required fields of a new lead.
pub fn validate_lead_form(form: &LeadForm) -> PortResult<()> {
    check_lead_fields(LeadFields {
        student_name: &form.student_name,
        parent_name: &form.parent_name,
        contact_number: &form.contact_number,
        contact_email: form.contact_email.as_deref(),
        class_name: &form.class_name,
        street: &form.street,
    })
}

/// Applies the same checks to a stored lead, e.g. after a patch was merged.
pub fn validate_lead(lead: &Lead) -> PortResult<()> {
    check_lead_fields(LeadFields {
        student_name: &lead.student_name,
        parent_name: &lead.parent_name,
        contact_number: &lead.contact_number,
        contact_email: lead.contact_email.as_deref(),
        class_name: &lead.class_name,
        street: &lead.street,
    })
}

struct LeadFields<'a> {
    student_name: &'a str,
    parent_name: &'a str,
    contact_number: &'a str,
    contact_email: Option<&'a str>,
    class_name: &'a str,
    street: &'a str,
}

fn check_lead_fields(fields: LeadFields<'_>) -> PortResult<()> {
    let required = [
        ("studentName", fields.student_name),
        ("parentName", fields.parent_name),
        ("contactNumber", fields.contact_number),
        ("class", fields.class_name),
        ("street", fields.street),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(PortError::Validation(format!("{field} is required")));
    }
    if !validate_phone(fields.contact_number.trim()) {
        return Err(PortError::Validation(format!(
            "contactNumber '{}' is not a valid phone number",
            fields.contact_number
        )));
    }
    if let Some(email) = fields.contact_email.map(str::trim) {
        if !email.is_empty() && !validate_email(email) {
            return Err(PortError::Validation(format!(
                "contactEmail '{email}' is not a valid email address"
            )));
        }
    }
    Ok(())
}
