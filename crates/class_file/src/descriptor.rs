// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.3

use std::{fmt, str::FromStr};

use crate::{error::DescriptorError, utf8::Utf8Text};

type Result<T, E = DescriptorError> = std::result::Result<T, E>;

pub const MAX_ARRAY_DIMENSIONS: usize = 255;

const ARRAY: u32 = '[' as u32;
const CLASS: u32 = 'L' as u32;
const CLASS_END: u32 = ';' as u32;
const PARAMETERS_START: u32 = '(' as u32;
const PARAMETERS_END: u32 = ')' as u32;
const VOID: u32 = 'V' as u32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Object(Utf8Text),
}

impl BaseType {
    fn primitive(c: u32) -> Option<BaseType> {
        let base_type = match char::from_u32(c)? {
            'B' => BaseType::Byte,
            'C' => BaseType::Char,
            'D' => BaseType::Double,
            'F' => BaseType::Float,
            'I' => BaseType::Int,
            'J' => BaseType::Long,
            'S' => BaseType::Short,
            'Z' => BaseType::Boolean,
            _ => return None,
        };
        Some(base_type)
    }

    /// The Java source name of a primitive, or the binary name of a class.
    pub fn display_name(&self) -> String {
        match self {
            BaseType::Byte => "byte".into(),
            BaseType::Char => "char".into(),
            BaseType::Double => "double".into(),
            BaseType::Float => "float".into(),
            BaseType::Int => "int".into(),
            BaseType::Long => "long".into(),
            BaseType::Short => "short".into(),
            BaseType::Boolean => "boolean".into(),
            BaseType::Object(class_name) => class_name.to_string(),
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
            BaseType::Object(class_name) => return write!(f, "L{};", class_name),
        };
        write!(f, "{}", c)
    }
}

/// The type of a field, parameter, local variable or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    base_type: BaseType,
    array_dimensions: u8,
}

impl FieldDescriptor {
    pub fn parse(text: &Utf8Text) -> Result<Self> {
        let chars = text.chars().collect::<Vec<_>>();
        if chars.is_empty() {
            return Err(DescriptorError::Empty);
        }

        let (descriptor, rest) = parse_field(&chars)?;
        if !rest.is_empty() {
            return Err(DescriptorError::TrailingCharacters);
        }

        Ok(descriptor)
    }

    pub fn is_valid(text: &Utf8Text) -> bool {
        Self::parse(text).is_ok()
    }

    pub fn base_type(&self) -> &BaseType {
        &self.base_type
    }

    pub fn array_dimensions(&self) -> u8 {
        self.array_dimensions
    }

    pub fn is_array(&self) -> bool {
        self.array_dimensions > 0
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_array() && !matches!(self.base_type, BaseType::Object(_))
    }

    /// The binary name of the class, for class types and arrays of them.
    pub fn class_name(&self) -> Option<&Utf8Text> {
        match &self.base_type {
            BaseType::Object(class_name) => Some(class_name),
            _ => None,
        }
    }

    /// Element display name followed by `[]` per dimension, e.g. `int[][]`.
    pub fn display_name(&self) -> String {
        let mut name = self.base_type.display_name();
        for _ in 0..self.array_dimensions {
            name.push_str("[]");
        }
        name
    }
}

fn parse_field(chars: &[u32]) -> Result<(FieldDescriptor, &[u32])> {
    let dimensions = chars.iter().take_while(|&&c| c == ARRAY).count();
    if dimensions > MAX_ARRAY_DIMENSIONS {
        return Err(DescriptorError::TooManyArrayDimensions);
    }

    let invalid = |c: u32| {
        if dimensions > 0 {
            DescriptorError::MissingArrayElementType
        } else {
            match char::from_u32(c) {
                Some(c) => DescriptorError::InvalidType(c),
                None => DescriptorError::InvalidCharacter(c),
            }
        }
    };

    let (base_type, rest) = match chars[dimensions..].split_first() {
        None if dimensions > 0 => return Err(DescriptorError::MissingArrayElementType),
        None => return Err(DescriptorError::Empty),
        Some((&CLASS, rest)) => {
            let end = rest
                .iter()
                .position(|&c| c == CLASS_END)
                .ok_or(DescriptorError::MissingSemicolon)?;
            if end == 0 {
                return Err(DescriptorError::MissingClassName);
            }
            (
                BaseType::Object(Utf8Text::from_decoded(&rest[..end])),
                &rest[end + 1..],
            )
        }
        Some((&c, rest)) => (BaseType::primitive(c).ok_or_else(|| invalid(c))?, rest),
    };

    Ok((
        FieldDescriptor {
            base_type,
            array_dimensions: dimensions as u8,
        },
        rest,
    ))
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.array_dimensions {
            write!(f, "[")?;
        }
        write!(f, "{}", self.base_type)
    }
}

impl TryFrom<&Utf8Text> for FieldDescriptor {
    type Error = DescriptorError;

    fn try_from(text: &Utf8Text) -> Result<Self> {
        Self::parse(text)
    }
}

impl FromStr for FieldDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(&Utf8Text::encode(s))
    }
}

/// Parameter and return types of a method. A `None` return type is `void`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    parameters: Vec<FieldDescriptor>,
    return_type: Option<FieldDescriptor>,
}

impl MethodDescriptor {
    pub fn parse(text: &Utf8Text) -> Result<Self> {
        let chars = text.chars().collect::<Vec<_>>();

        let mut rest = match chars.split_first() {
            Some((&PARAMETERS_START, rest)) => rest,
            _ => return Err(DescriptorError::MissingParameterList),
        };

        let mut parameters = Vec::new();
        loop {
            match rest.split_first() {
                None => return Err(DescriptorError::UnterminatedParameterList),
                Some((&PARAMETERS_END, after)) => {
                    rest = after;
                    break;
                }
                Some(_) => {
                    let (parameter, after) = parse_field(rest)?;
                    parameters.push(parameter);
                    rest = after;
                }
            }
        }

        let return_type = match rest {
            [] => return Err(DescriptorError::MissingReturnType),
            [VOID] => None,
            [VOID, ..] => return Err(DescriptorError::TrailingCharacters),
            _ => {
                let (return_type, after) = parse_field(rest)?;
                if !after.is_empty() {
                    return Err(DescriptorError::TrailingCharacters);
                }
                Some(return_type)
            }
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    pub fn is_valid(text: &Utf8Text) -> bool {
        Self::parse(text).is_ok()
    }

    pub fn parameters(&self) -> &[FieldDescriptor] {
        &self.parameters
    }

    pub fn return_type(&self) -> Option<&FieldDescriptor> {
        self.return_type.as_ref()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for parameter in &self.parameters {
            write!(f, "{}", parameter)?;
        }
        write!(f, ")")?;
        match &self.return_type {
            Some(return_type) => write!(f, "{}", return_type),
            None => write!(f, "V"),
        }
    }
}

impl TryFrom<&Utf8Text> for MethodDescriptor {
    type Error = DescriptorError;

    fn try_from(text: &Utf8Text) -> Result<Self> {
        Self::parse(text)
    }
}

impl FromStr for MethodDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(&Utf8Text::encode(s))
    }
}


#[cfg(test)]
mod method_descriptor_tests {
    use super::*;

    fn parse(s: &str) -> Result<MethodDescriptor> {
        s.parse()
    }

    fn field(s: &str) -> FieldDescriptor {
        s.parse().unwrap()
    }

    #[test]
    fn it_should_parse_parameters_and_return_type() {
        let d = parse("(SCLjava/lang/String;)[B").unwrap();

        assert_eq!(
            d.parameters(),
            &[field("S"), field("C"), field("Ljava/lang/String;")]
        );
        assert_eq!(d.return_type(), Some(&field("[B")));
        assert_eq!(d.to_string(), "(SCLjava/lang/String;)[B");
    }

    #[test]
    fn it_should_treat_v_as_no_return_type() {
        let d = parse("()V").unwrap();

        assert!(d.parameters().is_empty());
        assert_eq!(d.return_type(), None);
    }

    #[test]
    fn it_should_parse_array_parameters() {
        let d = parse("([Ljava/lang/String;[[IJ)Z").unwrap();

        assert_eq!(
            d.parameters(),
            &[field("[Ljava/lang/String;"), field("[[I"), field("J")]
        );
        assert_eq!(d.return_type(), Some(&field("Z")));
    }

    #[test]
    fn it_should_reject_malformed_parameter_lists() {
        assert_eq!(parse(")Z"), Err(DescriptorError::MissingParameterList));
        assert_eq!(parse("Z"), Err(DescriptorError::MissingParameterList));
        assert_eq!(parse("Z()Z"), Err(DescriptorError::MissingParameterList));
        assert_eq!(parse(""), Err(DescriptorError::MissingParameterList));
        assert_eq!(parse("(Z"), Err(DescriptorError::UnterminatedParameterList));
        assert_eq!(parse("([)V"), Err(DescriptorError::MissingArrayElementType));
        assert_eq!(parse("(V)V"), Err(DescriptorError::InvalidType('V')));
    }

    #[test]
    fn it_should_reject_malformed_return_types() {
        assert_eq!(parse("()"), Err(DescriptorError::MissingReturnType));
        assert_eq!(parse("()M"), Err(DescriptorError::InvalidType('M')));
        assert_eq!(parse("()VV"), Err(DescriptorError::TrailingCharacters));
        assert_eq!(parse("()[V"), Err(DescriptorError::MissingArrayElementType));
        assert_eq!(parse("()II"), Err(DescriptorError::TrailingCharacters));
    }
}
