//! Prompt templates for the chat and ingestion pipelines.
//!
//! Every LLM call in the service uses one of these fixed templates. The
//! builders only interpolate caller data; the instructions themselves
//! never vary at runtime.

/// System instruction for rewriting a conversational question into a
/// standalone one.
pub const QUERY_REWRITE_SYSTEM: &str = "You are a query rewriting expert. \
Given the chat history and the latest user question, rephrase the latest \
question into a complete, standalone English question that can be understood \
without any chat history. Only output the rewritten question and nothing else.";

/// Answer returned without consulting the LLM when retrieval yields nothing.
pub const NO_CONTEXT_FALLBACK: &str =
    "I couldn't find the details right now. Maybe not present in the document I Have.";

/// User-facing sentence returned on any pipeline failure.
pub const CHAT_ERROR_ANSWER: &str = "An error occurred while processing your request.";

/// Controlled vocabulary of entity types used across extraction prompts
/// and graph storage.
pub const NODE_TYPE_VOCABULARY: &[&str] = &[
    "Mission",
    "Group",
    "Mouse",
    "Training",
    "Diet",
    "Habitat",
    "Measurement",
    "Tissue",
    "Method",
    "Outcome",
    "Institution",
];

/// Build the answer-composition system prompt with the retrieved context
/// embedded verbatim.
pub fn answer_system_prompt(context: &str) -> String {
    format!(
        "You are Astrea, the official AI assistant for NASA's Space Biology \
Knowledge Engine. Your goal is to help scientists, mission planners, and \
researchers explore NASA's bioscience publications efficiently. If the user \
greets, greet them warmly and ask how you can assist with space biology \
research.\n\
When a user asks a question:\n\
- Use the provided context (summarized publications, experiments, findings) to answer.\n\
- If the context does not contain enough information, reply: \"I could not \
find sufficient information in the current dataset. Please refer to NASA's \
Open Science Data Repository for more details.\"\n\
Always keep answers clear and concise, focused on the user's query, and \
structured with sections like 'Key Findings', 'Experiments', 'Missions', \
'Links' when possible. When relationships between experiments, organisms, \
and missions are available, highlight them clearly so they can be visualized \
in a knowledge graph.\n\n\
Context: {context}"
    )
}

/// Build the entity-name extraction prompt used by the graph fetcher.
pub fn entity_extraction_prompt(question: &str, context: &str) -> String {
    format!(
        "Extract the names of entities mentioned in the question and context \
below that could appear in a knowledge graph of mouse spaceflight \
experiments. Only consider entities of these types: {types}.\n\
Return the names as a single comma-separated list and nothing else. Keep \
acronyms (ISS, NASA) uppercase. If no entities are present, return an empty \
line.\n\n\
Question: {question}\n\n\
Context: {context}",
        types = NODE_TYPE_VOCABULARY.join(" | "),
    )
}

/// Build the triple-extraction prompt for one document chunk. The chunk
/// text must already be truncated by the caller.
pub fn triple_extraction_prompt(text: &str) -> String {
    format!(
        r#"You are extracting a domain-specific knowledge graph for mouse spaceflight experiments.

1) Identify Entity Types (Nodes) from this controlled set:
   Mission | Group | Mouse | Training | Diet | Habitat | Measurement | Tissue | Method | Outcome | Institution

2) Define Relationship Templates (Edges) using ONLY these types:
   (:Mission)-[:HAS_GROUP]->(:Group)
   (:Group)-[:CONTAINS]->(:Mouse)
   (:Mouse)-[:UNDERWENT]->(:Training)
   (:Mouse)-[:FED]->(:Diet)
   (:Mouse)-[:HOUSED_IN]->(:Habitat)
   (:Mouse)-[:HAS_MEASUREMENT]->(:Measurement)
   (:Mouse)-[:SAMPLED_FOR]->(:Tissue)
   (:Tissue)-[:ANALYZED_BY]->(:Method)
   (:Mouse)-[:RESULTED_IN]->(:Outcome)
   (:Institution)-[:CONDUCTED]->(:Mission)

Rules:
- Prefer concrete, specific entities (e.g., Bion-M1 mission, SF group, Mouse IDs, specific tissues/methods/measurements).
- If a relation doesn't fit the templates, omit it.
- Use concise names; keep acronyms (ISS, NASA) uppercase. Avoid pronouns.
- Confidence between 0 and 1.

Return ONLY valid JSON in this shape:
{{
  "entities": [
    {{ "name": string, "type": string }}
  ],
  "relations": [
    {{ "subject": string, "subjectType": string, "predicate": string, "object": string, "objectType": string, "confidence": number }}
  ]
}}

Text:
"""{text}"""
"#
    )
}
