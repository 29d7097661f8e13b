//! LLM prompt engineering for receipt field extraction
//!
//! The template is fixed: the only varying part of a prompt is the reduced
//! receipt text, so the same input always renders the same prompt.

/// System message sent with every extraction request
pub const SYSTEM_PROMPT: &str =
    "You are a strict JSON extraction engine. Always respond with a JSON object.";

/// Builds prompts for the LLM to extract the amount and purchase date
pub struct PromptBuilder {
    text: String,
}

impl PromptBuilder {
    /// Create a new prompt builder for already-reduced receipt text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(
            EXTRACTION_INSTRUCTIONS.len() + WORKED_EXAMPLES.len() + self.text.len() + 64,
        );

        // 1. Output contract
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        // 2. Few-shot examples
        prompt.push_str(WORKED_EXAMPLES);
        prompt.push_str("\n\n");

        // 3. The receipt
        prompt.push_str("Now process this receipt:\n\n");
        prompt.push_str("Input:\n'''\n");
        prompt.push_str(&self.text);
        prompt.push_str("\n'''\n");

        prompt
    }
}

/// Render the extraction prompt for reduced receipt text
pub fn build(text: &str) -> String {
    PromptBuilder::new(text).build()
}

const EXTRACTION_INSTRUCTIONS: &str = r#"Your entire response MUST be a single JSON object, with nothing before it and nothing after it.

The JSON object must have exactly these keys:
- "amount": the final total paid (including tax), as a string with 2 decimals, e.g. "23.45", or null if unknown.
- "purchase_date": the purchase date as a string in "YYYY-MM-DD" format, or null if unknown.

Notes:
- The total may be labelled Total, Amount Due, Balance, or similar. If the total is unclear, use the largest currency amount.
- Dates may appear as YYYY-MM-DD, MM-DD-YYYY, MM/DD/YYYY, MM.DD.YY and so on, with or without leading zeros.
- Two-digit years are in the 2000s ("25" means 2025)."#;

const WORKED_EXAMPLES: &str = r#"Example:

Input:
'''
Total: $24.19
Date: 11/26/25
'''

Correct output:
{"amount": "24.19", "purchase_date": "2025-11-26"}

If the date or amount cannot be determined, use null:

Input:
'''
Total: $24.19
Thank you for your visit
'''

Correct output:
{"amount": "24.19", "purchase_date": null}

If the OCR engine misread a character, make your best guess for the intended digit:

Input:
'''
Total: $139.7h
Date: I2/06/2023
'''

Correct output:
{"amount": "139.75", "purchase_date": "2023-12-06"}"#;
