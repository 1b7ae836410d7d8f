//! C type to Keel type mapping.
//!
//! Conversion is total: every [`ForeignType`] maps to a [`DataType`] or to
//! `None` ("unrepresentable"). Integers collapse to the signed type of the
//! same width, and kinds with no Keel counterpart degrade to an opaque byte
//! pointer rather than failing.

use keel_core::DataType;

use crate::frontend::ForeignType;

/// Longest fixed-size array imported as a tuple. Longer arrays are
/// unrepresentable.
pub const MAX_ARRAY_LEN: usize = 1 << 16;

/// Convert a C type. Returns `None` if the type cannot be represented.
pub fn convert_type(ty: &ForeignType) -> Option<DataType> {
    let converted = match ty {
        ForeignType::Void => DataType::Void,
        ForeignType::Bool => DataType::Bool,

        ForeignType::CharS | ForeignType::SChar | ForeignType::UChar | ForeignType::CharU => {
            DataType::int8()
        }
        ForeignType::Short | ForeignType::UShort | ForeignType::Char16 | ForeignType::WChar => {
            DataType::int16()
        }
        ForeignType::Int | ForeignType::UInt | ForeignType::Char32 | ForeignType::Enum => {
            DataType::int32()
        }
        ForeignType::Long | ForeignType::ULong | ForeignType::LongLong | ForeignType::ULongLong => {
            DataType::int64()
        }

        ForeignType::Float => DataType::float(),
        ForeignType::Double => DataType::double(),
        ForeignType::LongDouble => DataType::float80(),

        ForeignType::NullPtr
        | ForeignType::ObjCId
        | ForeignType::ObjCSel
        | ForeignType::Unexposed
        | ForeignType::Other(_) => DataType::opaque_pointer(),
        ForeignType::IncompleteArray(element) => {
            convert_type(element)?;
            DataType::opaque_pointer()
        }
        ForeignType::Invalid => return None,

        ForeignType::Pointer(pointee) => return convert_pointer(pointee),
        ForeignType::ConstantArray { element, len } => {
            if *len > MAX_ARRAY_LEN {
                return None;
            }
            DataType::Tuple(vec![convert_type(element)?; *len])
        }
        ForeignType::FunctionProto { .. } | ForeignType::FunctionNoProto { .. } => {
            return convert_function_type(ty)
        }

        ForeignType::Typedef(name) | ForeignType::Record(name) => {
            if name.is_empty() {
                return None;
            }
            DataType::custom(name.as_str())
        }
    };
    Some(converted)
}

fn convert_pointer(pointee: &ForeignType) -> Option<DataType> {
    match pointee {
        // The calling convention is not part of a Keel function type.
        ty if ty.is_function() => convert_function_type(ty),
        ForeignType::Void => Some(DataType::opaque_pointer()),
        ty => convert_type(ty).map(DataType::pointer_to),
    }
}

/// Convert a C function type. Any unconvertible part fails the whole type.
pub fn convert_function_type(ty: &ForeignType) -> Option<DataType> {
    match ty {
        ForeignType::FunctionProto { result, params, .. } => {
            let returns = convert_type(result)?;
            let args = params.iter().map(convert_type).collect::<Option<Vec<_>>>()?;
            Some(DataType::function(args, returns))
        }
        ForeignType::FunctionNoProto { result } => Some(DataType::function(Vec::new(), convert_type(result)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proto(result: ForeignType, params: Vec<ForeignType>) -> ForeignType {
        ForeignType::FunctionProto {
            result: Box::new(result),
            params,
            variadic: false,
        }
    }

    #[test]
    fn conversion_table() {
        let cases: Vec<(ForeignType, Option<DataType>)> = vec![
            (ForeignType::Void, Some(DataType::Void)),
            (ForeignType::Bool, Some(DataType::Bool)),
            (ForeignType::CharS, Some(DataType::int8())),
            (ForeignType::UChar, Some(DataType::int8())),
            (ForeignType::Short, Some(DataType::int16())),
            (ForeignType::UShort, Some(DataType::int16())),
            (ForeignType::WChar, Some(DataType::int16())),
            (ForeignType::Char16, Some(DataType::int16())),
            (ForeignType::Int, Some(DataType::int32())),
            (ForeignType::UInt, Some(DataType::int32())),
            (ForeignType::Char32, Some(DataType::int32())),
            (ForeignType::Enum, Some(DataType::int32())),
            (ForeignType::Long, Some(DataType::int64())),
            (ForeignType::ULongLong, Some(DataType::int64())),
            (ForeignType::Float, Some(DataType::float())),
            (ForeignType::Double, Some(DataType::double())),
            (ForeignType::LongDouble, Some(DataType::float80())),
            (ForeignType::ObjCSel, Some(DataType::opaque_pointer())),
            (ForeignType::ObjCId, Some(DataType::opaque_pointer())),
            (ForeignType::NullPtr, Some(DataType::opaque_pointer())),
            (ForeignType::Unexposed, Some(DataType::opaque_pointer())),
            (ForeignType::Other("vector".into()), Some(DataType::opaque_pointer())),
            (ForeignType::Invalid, None),
            (ForeignType::Void.pointer_to(), Some(DataType::opaque_pointer())),
            (
                ForeignType::Int.pointer_to().pointer_to(),
                Some(DataType::int32().pointer_to().pointer_to()),
            ),
            (ForeignType::Invalid.pointer_to(), None),
            (ForeignType::Typedef("size_t".into()), Some(DataType::custom("size_t"))),
            (ForeignType::Record("tm".into()), Some(DataType::custom("tm"))),
            (ForeignType::Record(String::new()), None),
        ];
        for (foreign, expected) in cases {
            assert_eq!(convert_type(&foreign), expected, "converting {foreign:?}");
        }
    }

    #[test]
    fn fixed_arrays_become_tuples() {
        let array = ForeignType::ConstantArray {
            element: Box::new(ForeignType::Float),
            len: 3,
        };
        assert_eq!(
            convert_type(&array),
            Some(DataType::Tuple(vec![DataType::float(); 3]))
        );

        let bad = ForeignType::ConstantArray {
            element: Box::new(ForeignType::Invalid),
            len: 2,
        };
        assert_eq!(convert_type(&bad), None);

        let cases = vec![
            (MAX_ARRAY_LEN, true),
            (MAX_ARRAY_LEN + 1, false),
            (usize::MAX, false),
            (i64::MAX as usize, false),
        ];
        for (len, representable) in cases {
            let array = ForeignType::ConstantArray {
                element: Box::new(ForeignType::CharS),
                len,
            };
            assert_eq!(convert_type(&array).is_some(), representable, "array of {len}");
        }
    }

    #[test]
    fn incomplete_arrays_degrade() {
        let ok = ForeignType::IncompleteArray(Box::new(ForeignType::Int));
        assert_eq!(convert_type(&ok), Some(DataType::opaque_pointer()));
        let bad = ForeignType::IncompleteArray(Box::new(ForeignType::Invalid));
        assert_eq!(convert_type(&bad), None);
    }

    #[test]
    fn function_pointers_drop_the_pointer() {
        let callback = proto(ForeignType::Void, vec![ForeignType::Int]).pointer_to();
        assert_eq!(
            convert_type(&callback),
            Some(DataType::function(vec![DataType::int32()], DataType::Void))
        );
    }

    #[test]
    fn function_conversion_is_atomic() {
        let good = proto(ForeignType::Double, vec![ForeignType::Double, ForeignType::Int]);
        assert_eq!(
            convert_function_type(&good),
            Some(DataType::function(
                vec![DataType::double(), DataType::int32()],
                DataType::double()
            ))
        );

        let bad_param = proto(ForeignType::Int, vec![ForeignType::Int, ForeignType::Invalid]);
        assert_eq!(convert_function_type(&bad_param), None);

        let bad_result = proto(ForeignType::Invalid, vec![]);
        assert_eq!(convert_function_type(&bad_result), None);

        assert_eq!(convert_function_type(&ForeignType::Int), None);
    }

    #[test]
    fn unprototyped_functions_take_no_arguments() {
        let old = ForeignType::FunctionNoProto {
            result: Box::new(ForeignType::Long),
        };
        assert_eq!(
            convert_type(&old),
            Some(DataType::function(vec![], DataType::int64()))
        );
    }
}
