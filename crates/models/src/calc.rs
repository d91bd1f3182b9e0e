use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MultiplyQuery {
    /// First factor
    pub a: f64,
    /// Second factor
    pub b: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, ToSchema)]
pub struct MultiplyResult {
    pub result: f64,
    pub operation: String,
    pub inputs: Vec<f64>,
}

impl MultiplyQuery {
    pub fn evaluate(self) -> MultiplyResult {
        MultiplyResult { result: self.a * self.b, operation: "multiplication".into(), inputs: vec![self.a, self.b] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplies_and_echoes_inputs() {
        let out = MultiplyQuery { a: 3.0, b: 5.0 }.evaluate();
        assert_eq!(out.result, 15.0);
        assert_eq!(out.operation, "multiplication");
        assert_eq!(out.inputs, vec![3.0, 5.0]);
    }

    #[test]
    fn serializes_like_the_http_body() {
        let v = serde_json::to_value(MultiplyQuery { a: 2.5, b: -2.0 }.evaluate()).unwrap();
        assert_eq!(v, serde_json::json!({"result": -5.0, "operation": "multiplication", "inputs": [2.5, -2.0]}));
    }
}
