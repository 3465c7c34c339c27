//! Prompt templates for the pipeline stages.
//!
//! Prompt wording is a tuning concern, not a structural one, so it lives
//! behind the `PromptStore` trait: stages ask the manager to render a
//! template by id and never embed prompt text themselves. The in-memory
//! store ships the default prompt per stage; callers can inject their own
//! store to experiment with alternate prompt bodies without touching stage
//! logic.

use crate::errors::StageError;
use std::collections::HashMap;

/// A prompt template: an ordered list of named sections that are
/// concatenated and then variable-substituted at render time.
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    pub id: String,
    pub sections: Vec<(String, String)>, // (name, content)
}

pub trait PromptStore: Send + Sync {
    fn get_template(&self, id: &str) -> Result<PromptTemplate, StageError>;
}

/// Store with the default stage prompts baked in.
pub struct InMemoryPromptStore {
    templates: HashMap<String, PromptTemplate>,
}

impl InMemoryPromptStore {
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        for (id, sections) in default_templates() {
            templates.insert(
                id.to_string(),
                PromptTemplate {
                    id: id.to_string(),
                    sections: sections
                        .into_iter()
                        .map(|(n, c)| (n.to_string(), c.to_string()))
                        .collect(),
                },
            );
        }
        Self { templates }
    }

    /// Replace or add a template, e.g. to trial an alternate prompt body.
    pub fn insert(&mut self, template: PromptTemplate) {
        self.templates.insert(template.id.clone(), template);
    }
}

impl Default for InMemoryPromptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptStore for InMemoryPromptStore {
    fn get_template(&self, id: &str) -> Result<PromptTemplate, StageError> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| StageError::Prompt(format!("no prompt template registered for '{id}'")))
    }
}

pub struct PromptManager<S: PromptStore> {
    store: S,
}

impl<S: PromptStore> PromptManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Concatenate the template's sections and substitute `{var}` markers.
    pub fn render(&self, id: &str, vars: &HashMap<String, String>) -> Result<String, StageError> {
        let template = self.store.get_template(id)?;
        let mut buf = String::new();
        for (_name, content) in template.sections {
            buf.push_str(&content);
            if !buf.ends_with('\n') {
                buf.push('\n');
            }
            buf.push('\n');
        }
        let mut rendered = buf;
        for (k, v) in vars {
            let needle = format!("{{{}}}", k);
            rendered = rendered.replace(&needle, v);
        }
        Ok(rendered)
    }
}

pub const QUERY_EXPANSION_PROMPT: &str = "query_expansion";
pub const REQUIREMENT_DERIVATION_PROMPT: &str = "requirement_derivation";
pub const PLAN_SYNTHESIS_PROMPT: &str = "plan_synthesis";
pub const MARKUP_SYNTHESIS_PROMPT: &str = "markup_synthesis";

fn default_templates() -> Vec<(&'static str, Vec<(&'static str, &'static str)>)> {
    vec![
        (
            QUERY_EXPANSION_PROMPT,
            vec![
                (
                    "task",
                    "### Task:\n\
                     You are interpreting a user's wireframe request to make it clearer for \
                     processing. Restructure the query for better comprehension WITHOUT adding \
                     new information or removing any specification provided by the user.\n\n\
                     ### Original Request:\n\"{user_query}\"",
                ),
                (
                    "instructions",
                    "### Instructions:\n\
                     1. Preserve ALL technical specifications exactly as provided (dimensions, components, layout details)\n\
                     2. Preserve ALL functional requirements and style preferences mentioned by the user\n\
                     3. Reorganize information in a logical structure if needed (e.g., group by page/component)\n\
                     4. Fix unclear phrasing or ambiguous language\n\
                     5. Do NOT add features, pages, or requirements not explicitly mentioned\n\
                     6. Do NOT remove any detail provided by the user, no matter how minor\n\
                     7. Phrase the result in first person (\"I want to create ...\"), not \"the user has requested\"",
                ),
                (
                    "format",
                    "### Response Format:\n\
                     Return only a JSON object:\n\
                     ```json\n\
                     {\"interpreted_query\": \"Your restructured query here\"}\n\
                     ```",
                ),
            ],
        ),
        (
            REQUIREMENT_DERIVATION_PROMPT,
            vec![
                (
                    "task",
                    "### Introduction:\n\
                     You are an expert requirements gathering agent for a wireframe generator. \
                     Analyze the user request and extract the detailed specifications needed to \
                     create appropriate wireframes.\n\n\
                     ### Context:\n\
                     The user has requested: \"{user_query}\"",
                ),
                (
                    "instructions",
                    "### Instructions:\n\
                     1. Identify the core request: type of website/application, primary purpose, business goals\n\
                     2. Identify explicit requirements: features, pages, and design elements the user named\n\
                     3. Recognize implicit needs: standard features expected for this type of product\n\
                     4. Consider the target audience: demographics, goals, devices, accessibility\n\
                     5. Evaluate design preferences: fidelity level, style, layout\n\
                     6. Identify information gaps and make reasonable, clearly marked assumptions\n\
                     7. Apply industry-standard patterns for this type of website/application",
                ),
                (
                    "format",
                    "### Output Format:\n\
                     Format your response as structured JSON covering: project type and purpose, \
                     target audience, user journeys, visual and design preferences, features and \
                     functionality, content structure, technical considerations, and assumptions. \
                     Include a `confidence_level` property (low/medium/high) for each inferred \
                     requirement. Output a valid JSON object only, wrapped in a ```json code block.",
                ),
            ],
        ),
        (
            PLAN_SYNTHESIS_PROMPT,
            vec![
                (
                    "task",
                    "### Introduction:\n\
                     You are an expert wireframe planning agent translating project requirements \
                     into detailed wireframe specifications. Your expertise spans UX design \
                     principles, user flow optimization, information architecture, and visual \
                     hierarchy.\n\n\
                     ### Context:\n\
                     Based on these detailed requirements:\n\
                     {requirements_json}",
                ),
                (
                    "instructions",
                    "### Instructions:\n\
                     1. Prioritize requirements into must-have, should-have and nice-to-have\n\
                     2. Define the information architecture: complete sitemap, hierarchy, navigation patterns\n\
                     3. Map primary user flows with entry points, decision points and exits\n\
                     4. Design each screen layout: grid, content priority, component placement, spacing\n\
                     5. Specify UI components with states and reusable patterns\n\
                     6. Set the fidelity level (low, medium, high) and apply it consistently\n\
                     7. Document the reasoning behind each major decision",
                ),
                (
                    "format",
                    "### Output Format:\n\
                     Output a valid JSON object only. Do NOT include comments like '//' or \
                     trailing commas. Wrap your response in a ```json code block. Use descriptive \
                     keys and nested structures: metadata (project_name, fidelity_level, \
                     target_devices), strategic_overview, information_architecture, user_journeys, \
                     screens (id, name, purpose, layout, components, states, reasoning), \
                     component_library, design_system, technical_considerations.",
                ),
            ],
        ),
        (
            MARKUP_SYNTHESIS_PROMPT,
            vec![
                (
                    "task",
                    "### Introduction:\n\
                     You are an expert SVG wireframe generator translating wireframe plans into \
                     clean, semantic SVG code at the requested fidelity level.\n\n\
                     ### Context:\n\
                     Based on this wireframe plan:\n\
                     {plan_json}",
                ),
                (
                    "instructions",
                    "### Instructions:\n\
                     1. Create one screen per plan entry with clear separation (minimum 50px between screens)\n\
                     2. Set an appropriate viewBox (e.g., 360x800 for mobile) and width/height of 100%\n\
                     3. Define a style section with classes: .screen, .screen-header, .screen-title, \
                     .form-field, .form-label, .button, .button-label, .navbar, .footer, \
                     .content-block, .arrow, .link-text\n\
                     4. Use ONLY ONE visual representation per element (text OR icon OR symbol), never overlapping\n\
                     5. Keep a minimum spacing of 5px between adjacent elements\n\
                     6. Group related elements with <g> tags using descriptive ids\n\
                     7. Connect screens with <path> arrows (marker-end arrowheads) labelled with the user action",
                ),
                (
                    "format",
                    "### Output:\n\
                     Return the complete SVG code (including all style definitions) that can be \
                     directly rendered in a browser.",
                ),
            ],
        ),
    ]
}
