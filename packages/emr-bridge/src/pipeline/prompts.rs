//! Prompt text for the generation-backed stages.

pub const SPLIT_QUERIES_SYSTEM: &str = "You find API documentation through web search. \
Given an EMR API documentation URL or base URL, write 3-5 short search queries that will surface \
the real API reference pages: endpoints, authentication, request and response formats. \
Respond with a JSON object only: {\"queries\": [\"query 1\", \"query 2\"]}.";

pub fn split_queries_user(api_doc_url: &str) -> String {
    let target = if api_doc_url.trim().is_empty() {
        "(none given, search for EMR API documentation in general)"
    } else {
        api_doc_url
    };
    format!(
        "API documentation URL or EMR base URL: {target}\n\
         Write 3-5 web search queries that find this EMR's API documentation \
         (REST endpoints, auth, POST/GET usage, request body format). \
         Respond with JSON only: {{\"queries\": [\"...\"]}}."
    )
}

pub const PLAN_EMR_SYSTEM: &str = r#"You map FHIR bundles onto EMR REST APIs. From the fetched API documentation and a summary of a sample FHIR bundle, produce a JSON request plan.

Respond with valid JSON only, no markdown, in this shape:
{
  "push_fhir": [
    {
      "method": "POST",
      "url": "absolute URL or a path relative to base_url",
      "headers": {"Content-Type": "application/json"},
      "body_template": {"patientId": "{{entry[0].resource.id}}"},
      "fhir_mapping": {"entry[0].resource.id": "patientId"},
      "description": "what this request does"
    }
  ],
  "get_fhir": [
    {"method": "GET", "url": "...", "headers": {}, "description": "..."}
  ]
}

Body template object values of the exact form {{path}} are replaced with values from the FHIR bundle, where path uses dots and [index] (for example entry[1].resource.subject.reference). Replacement only happens when fhir_mapping is non-empty, so list every path you use there. Authentication headers are added at execution time. Relative URLs are joined to the EMR base URL. Infer from the documentation whether the EMR wants one request per resource type or a single bundle upload."#;

pub fn plan_emr_user(doc_content: &str, fhir_summary: &str) -> String {
    format!(
        "Fetched API documentation:\n{doc_content}\n\n\
         Sample FHIR bundle (resource types and ids):\n{fhir_summary}\n\n\
         Produce the request plan JSON for push and get. Respond with the JSON object only."
    )
}

pub const CRITIQUE_SYSTEM: &str = r#"You review EMR API integration attempts. Given a request plan, whether its last trial run succeeded, and the HTTP status and response or error, respond with a JSON object:
- "confidence": number from 0 to 100, how confident you are that the plan is correct (70 or more means it is ready to save)
- "feedback": short explanation of what is wrong, if anything, and what to change next

Respond with valid JSON only: {"confidence": 75, "feedback": "..."}"#;

pub fn critique_user(plan_summary: &str, success: bool, status: Option<u16>, response_or_error: &str) -> String {
    let status = status.map_or_else(|| "none".to_string(), |s| s.to_string());
    format!(
        "Request plan (summary):\n{plan_summary}\n\
         Last trial succeeded: {success}\n\
         HTTP status: {status}\n\
         Response or error: {response_or_error}\n\n\
         Respond with JSON containing \"confidence\" (0-100) and \"feedback\"."
    )
}

pub const ALTER_PLAN_SYSTEM: &str = "You repair EMR API request plans. Given the current plan as JSON \
and review feedback, respond with the corrected plan as JSON only, in the same shape: a push_fhir array \
and a get_fhir array whose items have method, url, headers, body_template, fhir_mapping and description.";

pub fn alter_plan_user(plan_json: &str, feedback: &str) -> String {
    format!(
        "Current request plan:\n{plan_json}\n\n\
         Review feedback: {feedback}\n\n\
         Respond with the corrected request plan as JSON only."
    )
}
