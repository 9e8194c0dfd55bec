// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::math::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A value stored in a node attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum AttributeValue {
    /// A boolean flag, such as `visibility`.
    Bool(bool),
    /// An integer, such as an enum index.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A string value, such as a guide id.
    String(String),
    /// A 3D vector.
    Vec3(Vec3),
    /// An affine matrix.
    Matrix(Mat4),
    /// An ordered list of strings.
    StringList(Vec<String>),
}

impl AttributeValue {
    /// Returns the boolean value, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float value, if this is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the matrix value, if this is a `Matrix`.
    pub fn as_matrix(&self) -> Option<Mat4> {
        match self {
            AttributeValue::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    /// Returns the string list, if this is a `StringList`.
    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            AttributeValue::StringList(list) => Some(list),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<Mat4> for AttributeValue {
    fn from(v: Mat4) -> Self {
        AttributeValue::Matrix(v)
    }
}
