//! Conversion of parsed operation lines into management requests

mod error;
mod resolver;

pub use error::{IncompleteRequestError, RequestError, UnresolvedExpressionError};
pub use resolver::{substitute, EnvResolver, ExpressionResolver, MapResolver};

use crate::logging::codes;
use crate::parsing::{AddressNode, Argument, LineForm, ParsedLine};
use crate::value::ArgumentValue;
use crate::{log_error, log_success};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// One resolved `type=name` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressSegment {
    pub node_type: String,
    pub name: String,
}

impl AddressSegment {
    pub fn new(node_type: &str, name: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for AddressSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.node_type, self.name)
    }
}

/// Whether the caller needs an operation or only an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Single operation: the operation name is required
    #[default]
    Operation,
    /// Address-only navigation (`cd`-style); the operation is optional
    Navigation,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationRequest {
    pub address: Vec<AddressSegment>,
    pub operation: Option<String>,
    pub parameters: Vec<(String, ArgumentValue)>,
    pub headers: Vec<(String, ArgumentValue)>,
}

impl OperationRequest {
    /// Parameter value; the last duplicate wins
    pub fn parameter(&self, name: &str) -> Option<&ArgumentValue> {
        self.parameters
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Absolute address text, `/` for the root
    pub fn address_string(&self) -> String {
        if self.address.is_empty() {
            return "/".to_string();
        }
        self.address
            .iter()
            .map(|segment| format!("/{}", segment))
            .collect()
    }

    /// Management-model JSON form
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(operation) = &self.operation {
            map.insert("operation".to_string(), Value::String(operation.clone()));
        }

        let address = self
            .address
            .iter()
            .map(|segment| {
                let mut node = Map::new();
                node.insert(segment.node_type.clone(), Value::String(segment.name.clone()));
                Value::Object(node)
            })
            .collect();
        map.insert("address".to_string(), Value::Array(address));

        for (name, value) in &self.parameters {
            map.insert(name.clone(), value.to_json());
        }

        if !self.headers.is_empty() {
            let headers = self
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect();
            map.insert("operation-headers".to_string(), Value::Object(headers));
        }
        Value::Object(map)
    }
}

impl Serialize for OperationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Builds requests relative to a current address
pub struct RequestBuilder {
    base_address: Vec<AddressSegment>,
    mode: BuildMode,
    resolver: Option<Box<dyn ExpressionResolver>>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            base_address: Vec::new(),
            mode: BuildMode::Operation,
            resolver: None,
        }
    }

    /// Address that relative addresses start from
    pub fn with_base_address(mut self, base_address: Vec<AddressSegment>) -> Self {
        self.base_address = base_address;
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Without a resolver expressions and back-quoted values pass through
    /// unresolved
    pub fn with_resolver(mut self, resolver: Box<dyn ExpressionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(&self, line: ParsedLine) -> Result<OperationRequest, RequestError> {
        let result = self.build_request(line);
        match &result {
            Ok(request) => {
                log_success!(codes::success::REQUEST_BUILT, "Operation request built",
                    "address" => request.address_string(),
                    "operation" => request.operation.as_deref().unwrap_or("-")
                );
            }
            Err(error) => {
                log_error!(error.error_code(), "Operation request rejected",
                    "error" => error
                );
            }
        }
        result
    }

    fn build_request(&self, line: ParsedLine) -> Result<OperationRequest, RequestError> {
        if line.form == LineForm::Command {
            return Err(IncompleteRequestError::NotAnOperation {
                command: line.command.unwrap_or_default(),
            }
            .into());
        }

        let address = self.resolve_address(line.absolute, line.address)?;
        if line.operation.is_none() && self.mode == BuildMode::Operation {
            return Err(IncompleteRequestError::MissingOperation.into());
        }

        Ok(OperationRequest {
            address,
            operation: line.operation,
            parameters: self.resolve_arguments(line.arguments)?,
            headers: self.resolve_arguments(line.headers)?,
        })
    }

    pub fn resolve_address(
        &self,
        absolute: bool,
        nodes: Vec<AddressNode>,
    ) -> Result<Vec<AddressSegment>, IncompleteRequestError> {
        let mut address = if absolute {
            Vec::new()
        } else {
            self.base_address.clone()
        };

        for node in nodes {
            match node {
                AddressNode::Segment {
                    node_type,
                    name: Some(name),
                } => address.push(AddressSegment { node_type, name }),
                AddressNode::Segment {
                    node_type,
                    name: None,
                } => return Err(IncompleteRequestError::NodeTypeWithoutName { node_type }),
                AddressNode::Parent => {
                    address.pop().ok_or(IncompleteRequestError::ParentOfRoot)?;
                }
                AddressNode::Current => {}
            }
        }
        Ok(address)
    }

    fn resolve_arguments(
        &self,
        arguments: Vec<Argument>,
    ) -> Result<Vec<(String, ArgumentValue)>, UnresolvedExpressionError> {
        arguments
            .into_iter()
            .filter_map(|argument| {
                let name = argument.name?;
                let value = argument.value.unwrap_or_else(|| ArgumentValue::scalar("true"));
                Some((name, value))
            })
            .map(|(name, value)| self.resolve_value(value).map(|value| (name, value)))
            .collect()
    }

    fn resolve_value(&self, value: ArgumentValue) -> Result<ArgumentValue, UnresolvedExpressionError> {
        let Some(resolver) = &self.resolver else {
            return Ok(value);
        };
        Ok(match value {
            ArgumentValue::Expression(raw) => ArgumentValue::Scalar(resolver.resolve(&raw)?),
            ArgumentValue::BackQuoted(command) => {
                ArgumentValue::Scalar(resolver.substitute_command(&command)?)
            }
            ArgumentValue::Object(entries) => ArgumentValue::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| self.resolve_value(value).map(|value| (key, value)))
                    .collect::<Result<_, _>>()?,
            ),
            ArgumentValue::List(items) => ArgumentValue::List(
                items
                    .into_iter()
                    .map(|item| self.resolve_value(item))
                    .collect::<Result<_, _>>()?,
            ),
            scalar @ ArgumentValue::Scalar(_) => scalar,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_command;
    use assert_matches::assert_matches;

    fn build(text: &str) -> Result<OperationRequest, RequestError> {
        RequestBuilder::new().build(parse_command(text).unwrap())
    }

    #[test]
    fn test_request_json_shape() {
        let request = build(
            "/subsystem=logging/logger=app:write-attribute(name=level,value=DEBUG,value=INFO){rollback-on-runtime-failure=false}",
        )
        .unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["operation"], "write-attribute");
        assert_eq!(json["address"][0]["subsystem"], "logging");
        assert_eq!(json["address"][1]["logger"], "app");
        assert_eq!(json["value"], "INFO");
        assert_eq!(json["operation-headers"]["rollback-on-runtime-failure"], "false");
        assert_eq!(request.address_string(), "/subsystem=logging/logger=app");
    }

    #[test]
    fn test_flags_become_true_and_composites_nest() {
        let request = build(":add(enabled, props={a=1,b=[x,y]})").unwrap();
        assert_eq!(request.parameter("enabled"), Some(&ArgumentValue::scalar("true")));
        let json = request.to_json();
        assert_eq!(json["props"]["b"][1], "y");
        assert_eq!(json["address"], Value::Array(vec![]));
    }

    #[test]
    fn test_relative_address_uses_base() {
        let builder = RequestBuilder::new()
            .with_base_address(vec![
                AddressSegment::new("subsystem", "datasources"),
                AddressSegment::new("data-source", "ExampleDS"),
            ]);

        let up = builder.build(parse_command("../data-source=Other:read-resource").unwrap()).unwrap();
        assert_eq!(up.address_string(), "/subsystem=datasources/data-source=Other");

        let here = builder.build(parse_command(".:read-resource").unwrap()).unwrap();
        assert_eq!(here.address.len(), 2);

        let absolute = builder.build(parse_command("/:read-resource").unwrap()).unwrap();
        assert_eq!(absolute.address_string(), "/");
    }

    #[test]
    fn test_incomplete_requests() {
        assert_matches!(
            build("/subsystem:read-resource"),
            Err(RequestError::Incomplete(IncompleteRequestError::NodeTypeWithoutName { node_type }))
                if node_type == "subsystem"
        );
        assert_matches!(
            build("/subsystem=web"),
            Err(RequestError::Incomplete(IncompleteRequestError::MissingOperation))
        );
        assert_matches!(
            build("ls -l"),
            Err(RequestError::Incomplete(IncompleteRequestError::NotAnOperation { command }))
                if command == "ls"
        );
        assert_matches!(
            build("..:read-resource"),
            Err(RequestError::Incomplete(IncompleteRequestError::ParentOfRoot))
        );

        let navigation = RequestBuilder::new().with_mode(BuildMode::Navigation);
        let request = navigation.build(parse_command("/subsystem=web").unwrap()).unwrap();
        assert!(request.operation.is_none());
    }

    #[test]
    fn test_expressions_are_resolved() {
        let builder = RequestBuilder::new()
            .with_resolver(Box::new(MapResolver::new().with("size", "20")));

        let request = builder
            .build(parse_command(":op(a=${size}, b=[${size:1}, ${none:x}], c=plain)").unwrap())
            .unwrap();
        assert_eq!(request.parameter("a"), Some(&ArgumentValue::scalar("20")));
        assert_eq!(
            request.parameter("b"),
            Some(&ArgumentValue::List(vec!["20".into(), "x".into()]))
        );

        assert_matches!(
            builder.build(parse_command(":op(a=${none})").unwrap()),
            Err(RequestError::Unresolved(_))
        );
        assert_matches!(
            builder.build(parse_command(":op(a=`ls`)").unwrap()),
            Err(RequestError::Unresolved(_))
        );
    }

    #[test]
    fn test_unresolved_values_pass_through_without_resolver() {
        let request = build(":op(a=${x})").unwrap();
        assert_eq!(
            request.parameter("a"),
            Some(&ArgumentValue::Expression("${x}".to_string()))
        );
    }
}
