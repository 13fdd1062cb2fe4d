//! Business profile served by the receptionist tools

use serde::{Deserialize, Serialize};

/// FAQ entry matched by keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Lowercase keyword looked up in the caller's question
    pub keyword: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(keyword: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            answer: answer.into(),
        }
    }
}

/// Facts the receptionist is allowed to state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessProfile {
    #[serde(default = "default_company_name")]
    pub company_name: String,

    #[serde(default = "default_business_hours")]
    pub business_hours: String,

    #[serde(default = "default_location")]
    pub location: String,

    /// Checked in order; first keyword match wins
    #[serde(default = "default_faqs")]
    pub faqs: Vec<FaqEntry>,

    #[serde(default = "default_faq_fallback")]
    pub faq_fallback: String,

    #[serde(default = "default_sales_transfer_reply")]
    pub sales_transfer_reply: String,

    #[serde(default = "default_support_transfer_reply")]
    pub support_transfer_reply: String,

    #[serde(default = "default_sales_followup_reply")]
    pub sales_followup_reply: String,

    #[serde(default = "default_support_followup_reply")]
    pub support_followup_reply: String,
}

fn default_company_name() -> String {
    "Acme Corp".to_string()
}
fn default_business_hours() -> String {
    "Acme Corp is open Monday to Friday, 9 AM to 5 PM Pacific time. \
     We are closed on weekends and major holidays."
        .to_string()
}
fn default_location() -> String {
    "Acme Corp is located at 123 Main Street, San Francisco, California. \
     We have free visitor parking available."
        .to_string()
}
fn default_faqs() -> Vec<FaqEntry> {
    vec![
        FaqEntry::new(
            "pricing",
            "Our pricing starts at 49 dollars per month for the Starter plan, \
             149 dollars per month for Professional, and 399 dollars per month for Enterprise. \
             We also offer custom pricing for large organizations.",
        ),
        FaqEntry::new(
            "trial",
            "Yes, we offer a free 14-day trial of our Professional plan. \
             No credit card required to start.",
        ),
        FaqEntry::new(
            "support",
            "We offer email support for all plans, priority phone support for Professional plans, \
             and dedicated account managers for Enterprise customers.",
        ),
        FaqEntry::new(
            "refund",
            "We offer a 30-day money-back guarantee on all annual plans. \
             Monthly plans can be cancelled at any time.",
        ),
    ]
}
fn default_faq_fallback() -> String {
    "I don't have a specific answer for that question. \
     I can connect you with a team member who can help."
        .to_string()
}
fn default_sales_transfer_reply() -> String {
    "Connecting to the sales team now.".to_string()
}
fn default_support_transfer_reply() -> String {
    "Connecting to the support team now.".to_string()
}
fn default_sales_followup_reply() -> String {
    "I've noted your interest and a sales representative will follow up with you \
     within the next business day. Is there anything else I can help with?"
        .to_string()
}
fn default_support_followup_reply() -> String {
    "I've logged your support request and a technician will call you back \
     within 2 hours during business hours. Is there anything else I can help with?"
        .to_string()
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            business_hours: default_business_hours(),
            location: default_location(),
            faqs: default_faqs(),
            faq_fallback: default_faq_fallback(),
            sales_transfer_reply: default_sales_transfer_reply(),
            support_transfer_reply: default_support_transfer_reply(),
            sales_followup_reply: default_sales_followup_reply(),
            support_followup_reply: default_support_followup_reply(),
        }
    }
}

impl BusinessProfile {
    /// Answer for the first FAQ whose keyword appears in `question`
    pub fn faq_answer(&self, question: &str) -> &str {
        let question = question.to_lowercase();
        self.faqs
            .iter()
            .find(|faq| question.contains(&faq.keyword.to_lowercase()))
            .map(|faq| faq.answer.as_str())
            .unwrap_or(&self.faq_fallback)
    }
}
