// Prompt text and response schemas for the two resume calls.

use crate::model::{ExperienceEntry, StarField};
use serde_json::json;

/// Extraction prompt template. Replace `{resume}` before sending.
const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Analyze the provided resume text. Your task is to identify and extract all distinct professional experience entries.
For each entry, extract the "jobTitle" and "company".
Return the result as a JSON array of objects, in the same order the entries appear in the resume. Each object must have exactly the keys "jobTitle" and "company".
If no professional experiences are found, return an empty array.

Resume Text:
---
{resume}
---"#;

/// Final generation prompt template. Replace `{resume}` and `{star}` before sending.
const GENERATION_PROMPT_TEMPLATE: &str = r#"**Role:** You are an expert career coach and professional resume writer specializing in optimizing resumes for modern Applicant Tracking Systems (ATS) and human recruiters.

**Task:** Rewrite the "Professional Experience" section of the provided raw resume. You MUST use the structured STAR data below to construct compelling, achievement-oriented bullet points for each role.

**Context - Raw Resume (use this for structure, skills, education, etc.):**
---
{resume}
---

**Data to Use - User-Provided STAR Experiences:**
---
{star}
---

**Instructions & Rules:**
1. **Integrate STAR Data:** Replace the existing descriptions under the "Professional Experience" section with new bullet points derived ONLY from the provided STAR data.
2. **Professional Formatting:** For each experience, write 2-4 bullet points. Start each bullet point with a strong action verb. Quantify results wherever the data allows.
3. **ATS Optimization:** Keep the text clean, use relevant keywords from the context of the roles, and make it easy for ATS software to parse.
4. **Preserve Other Sections:** Keep all other sections of the raw resume (e.g. Summary, Education, Skills, Projects) exactly as they are. Do not add, remove, or alter information in those sections.
5. **Output Format:** Output ONLY the complete, rewritten resume text in a single block. Do not include any introductory or concluding phrases such as "Here is the optimized resume:". The output must be ready to copy and paste."#;

pub fn extraction_prompt(resume_text: &str) -> String {
    EXTRACTION_PROMPT_TEMPLATE.replace("{resume}", resume_text)
}

/// Gemini response schema: an array of `{jobTitle, company}` objects.
pub fn extraction_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "jobTitle": { "type": "STRING", "description": "The job title for the experience." },
                "company": { "type": "STRING", "description": "The company name for the experience." }
            },
            "required": ["jobTitle", "company"],
            "propertyOrdering": ["jobTitle", "company"]
        }
    })
}

/// Render every entry as a labelled STAR block.
pub fn star_block(entries: &[ExperienceEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let mut block = format!(
                "- Job Title: {}\n  Company: {}\n  STAR Details:\n",
                entry.job_title, entry.company
            );
            for field in StarField::ALL {
                block.push_str(&format!(
                    "  * {}: {}\n",
                    field.label(),
                    entry.field(field).trim()
                ));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn generation_prompt(resume_text: &str, entries: &[ExperienceEntry]) -> String {
    // Substitute into the template pieces only, never into user text.
    let star = star_block(entries);
    match GENERATION_PROMPT_TEMPLATE.split_once("{star}") {
        Some((head, tail)) => format!(
            "{}{}{}",
            head.replace("{resume}", resume_text),
            star,
            tail.replace("{resume}", resume_text)
        ),
        None => GENERATION_PROMPT_TEMPLATE.replace("{resume}", resume_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, title: &str, company: &str) -> ExperienceEntry {
        ExperienceEntry {
            id,
            job_title: title.into(),
            company: company.into(),
            situation: "Monolith under load".into(),
            task: "Split services".into(),
            action: "Led the migration".into(),
            result: "Latency down 40%".into(),
        }
    }

    #[test]
    fn test_extraction_prompt_embeds_resume() {
        let p = extraction_prompt("John Doe, Software Engineer at Acme Corp, 2019-2022");
        assert!(p.contains("Software Engineer at Acme Corp"));
        assert!(p.contains("\"jobTitle\""));
        assert!(!p.contains("{resume}"));
    }

    #[test]
    fn test_schema_requires_both_fields() {
        let schema = extraction_schema();
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(
            schema["items"]["required"],
            serde_json::json!(["jobTitle", "company"])
        );
    }

    #[test]
    fn test_star_block_lists_every_entry_and_field() {
        let block = star_block(&[entry(0, "Engineer", "Acme"), entry(1, "Lead", "Initech")]);
        assert!(block.contains("- Job Title: Engineer\n  Company: Acme"));
        assert!(block.contains("- Job Title: Lead\n  Company: Initech"));
        assert_eq!(block.matches("* Situation: Monolith under load").count(), 2);
        assert_eq!(block.matches("* Result: Latency down 40%").count(), 2);
    }

    #[test]
    fn test_generation_prompt_contains_rules_and_data() {
        let p = generation_prompt("JOHN DOE\nEducation: BSc", &[entry(0, "Engineer", "Acme")]);
        assert!(p.contains("JOHN DOE\nEducation: BSc"));
        assert!(p.contains("* Action: Led the migration"));
        assert!(p.contains("2-4 bullet points"));
        assert!(p.contains("exactly as they are"));
        assert!(p.contains("Do not include any introductory"));
    }

    #[test]
    fn test_generation_prompt_leaves_placeholders_in_user_text_alone() {
        let mut e = entry(0, "Engineer", "Acme");
        e.action = "Templated {resume} blocks".into();
        let p = generation_prompt("uses {star} notation", &[e]);
        assert!(p.contains("uses {star} notation"));
        assert!(p.contains("* Action: Templated {resume} blocks"));
    }
}
