//! Schemas for the functions advertised to the model.

use serde_json::json;

use crate::llm::FunctionSchema;

/// `add_instance(record)`: persist an extracted record to the catalog.
pub fn add_instance_schema() -> FunctionSchema {
    FunctionSchema {
        name: "add_instance".to_owned(),
        description: "Adds an instance JSON record to the catalog".to_owned(),
        parameters: json!({
            "type": "object",
            "properties": {
                "record": {"type": "string", "description": "JSON instance record"}
            },
        }),
    }
}

/// `load_instance(instance_url)`: show an existing record in the viewer.
pub fn load_instance_schema() -> FunctionSchema {
    FunctionSchema {
        name: "load_instance".to_owned(),
        description: "Loads an instance into the catalog viewer".to_owned(),
        parameters: json!({
            "type": "object",
            "properties": {
                "instance_url": {"type": "string", "description": "URL to a catalog instance"}
            },
        }),
    }
}

/// `load_sinopia(resource_url)`: fetch a linked-data resource as text.
pub fn load_sinopia_schema() -> FunctionSchema {
    FunctionSchema {
        name: "load_sinopia".to_owned(),
        description: "Loads a Sinopia URL and returns the RDF as JSON-LD".to_owned(),
        parameters: json!({
            "type": "object",
            "properties": {
                "resource_url": {"type": "string", "description": "URL to a Sinopia resource"}
            },
        }),
    }
}
