use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&success_body(message, data))?),
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?),
        OutputFormat::Text => println!("{}", message),
    }
    Ok(())
}

fn success_body(message: &str, data: Option<Value>) -> Value {
    let mut response = json!({
        "success": true,
        "message": message
    });
    if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
        body.extend(extra);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_merges_data() {
        let body = success_body("done", Some(json!({ "rowsImported": 3 })));
        assert_eq!(body, json!({ "success": true, "message": "done", "rowsImported": 3 }));
        assert_eq!(success_body("done", Some(json!([1]))), json!({ "success": true, "message": "done" }));
    }
}
