// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.4
//
// Checks that need the whole constant pool: entries may refer forwards, so
// none of this can happen while the pool is being read.

use log::debug;

use crate::{
    constant_pool::{
        ClassInfo, CpInfo, EntryKind, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo,
        ReferenceKind, StringInfo,
    },
    descriptor::{FieldDescriptor, MethodDescriptor},
    utf8::Utf8Text,
    ClassFile, ClassFileError, ConstantPool, Result,
};

/// First class file version whose method handles may use `invokestatic` and
/// `invokespecial` on interface methods.
const INTERFACE_METHOD_HANDLE_MAJOR_VERSION: u16 = 52;

/// Checks every constant pool entry against the entries it refers to. The
/// first offending entry, in index order, is reported.
pub fn validate(constant_pool: &ConstantPool, major_version: u16, minor_version: u16) -> Result<()> {
    debug!(
        "Validating {} constant pool slots for version {}.{}",
        constant_pool.len(),
        major_version,
        minor_version
    );

    for (index, cp_info) in constant_pool.iter() {
        validate_entry(constant_pool, index, cp_info, major_version)?;
    }

    Ok(())
}

fn validate_entry(
    constant_pool: &ConstantPool,
    index: u16,
    cp_info: &CpInfo,
    major_version: u16,
) -> Result<()> {
    match cp_info {
        CpInfo::Class(ClassInfo { name_index }) => {
            validate_class_name(index, constant_pool.utf8(*name_index)?)
        }
        CpInfo::String(StringInfo { string_index }) => {
            constant_pool.utf8(*string_index)?;
            Ok(())
        }
        CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }) => {
            constant_pool.utf8(*name_index)?;
            let descriptor = constant_pool.utf8(*descriptor_index)?;
            if descriptor.starts_with(&Utf8Text::encode("(")) {
                MethodDescriptor::parse(descriptor)?;
            } else {
                FieldDescriptor::parse(descriptor)?;
            }
            Ok(())
        }
        CpInfo::MethodType(MethodTypeInfo { descriptor_index }) => {
            MethodDescriptor::parse(constant_pool.utf8(*descriptor_index)?)?;
            Ok(())
        }
        CpInfo::InvokeDynamic(info) => {
            constant_pool.get::<NameAndTypeInfo>(info.name_and_type_index)?;
            Ok(())
        }
        CpInfo::MethodHandle(info) => {
            validate_method_handle(constant_pool, index, info, major_version)
        }
        _ => Ok(()),
    }
}

fn validate_method_handle(
    constant_pool: &ConstantPool,
    index: u16,
    info: &MethodHandleInfo,
    major_version: u16,
) -> Result<()> {
    use ReferenceKind::*;

    let target = constant_pool.kind_of(info.reference_index).ok();
    let valid = match (ReferenceKind::try_from(info.reference_kind), target) {
        (Ok(GetField | GetStatic | PutField | PutStatic), Some(EntryKind::FieldRef)) => true,
        (Ok(InvokeVirtual | NewInvokeSpecial), Some(EntryKind::MethodRef)) => true,
        (Ok(InvokeStatic | InvokeSpecial), Some(EntryKind::MethodRef)) => true,
        (Ok(InvokeStatic | InvokeSpecial), Some(EntryKind::InterfaceMethodRef)) => {
            major_version >= INTERFACE_METHOD_HANDLE_MAJOR_VERSION
        }
        (Ok(InvokeInterface), Some(EntryKind::InterfaceMethodRef)) => true,
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ClassFileError::InvalidMethodHandleReference {
            index,
            reference_kind: info.reference_kind,
            target,
        })
    }
}

/// A `Class` entry names either a class or interface in internal form, or an
/// array type by its field descriptor.
fn validate_class_name(index: u16, name: &Utf8Text) -> Result<()> {
    match FieldDescriptor::parse(name) {
        Ok(descriptor) if descriptor.is_array() => Ok(()),
        _ => validate_binary_name(index, name),
    }
}

/// Checks a class or interface name in internal form, e.g. `java/lang/Object`.
/// `index` is the constant pool entry reported on failure.
pub fn validate_binary_name(index: u16, name: &Utf8Text) -> Result<()> {
    let valid = !name.contains(&Utf8Text::encode("."))
        && name
            .split(&Utf8Text::encode("/"))
            .iter()
            .all(is_unqualified_name);

    if valid {
        Ok(())
    } else {
        Err(ClassFileError::InvalidBinaryName {
            index,
            name: name.to_string(),
        })
    }
}

/// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.2.2
pub fn is_unqualified_name(name: &Utf8Text) -> bool {
    let forbidden = [".", ";", "[", "/"].map(Utf8Text::encode);
    !name.contains_any(&forbidden)
}

/// Validates the constant pool, then the references the class file makes into
/// it: its own class, superclass, interfaces, and member names and descriptors.
pub fn validate_class_file(class_file: &ClassFile) -> Result<()> {
    let constant_pool = &class_file.constant_pool;
    validate(
        constant_pool,
        class_file.major_version,
        class_file.minor_version,
    )?;

    constant_pool.get::<ClassInfo>(class_file.this_class)?;
    // Only java/lang/Object has no superclass.
    if class_file.super_class != 0 {
        constant_pool.get::<ClassInfo>(class_file.super_class)?;
    }
    for &interface in &class_file.interfaces {
        constant_pool.get::<ClassInfo>(interface)?;
    }

    for field in &class_file.fields {
        constant_pool.utf8(field.name_index)?;
        FieldDescriptor::parse(constant_pool.utf8(field.descriptor_index)?)?;
    }
    for method in &class_file.methods {
        constant_pool.utf8(method.name_index)?;
        MethodDescriptor::parse(constant_pool.utf8(method.descriptor_index)?)?;
    }

    Ok(())
}

#[cfg(test)]
mod validate_tests {
    use super::*;
    use crate::{
        constant_pool::{InterfaceMethodRefInfo, InvokeDynamicInfo, LongInfo, MethodRefInfo},
        error::DescriptorError,
    };

    fn utf8(s: &str) -> CpInfo {
        CpInfo::Utf8(Utf8Text::encode(s))
    }

    fn class(name_index: u16) -> CpInfo {
        CpInfo::Class(ClassInfo { name_index })
    }

    fn method_handle(reference_kind: u8, reference_index: u16) -> CpInfo {
        CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        })
    }

    /// `Foo.run()V` as a method reference at 6 and an interface method
    /// reference at 7, followed by `extra` from index 8.
    fn pool_with(extra: Vec<CpInfo>) -> ConstantPool {
        let mut entries = vec![
            utf8("Foo"),
            class(1),
            utf8("run"),
            utf8("()V"),
            CpInfo::NameAndType(NameAndTypeInfo {
                name_index: 3,
                descriptor_index: 4,
            }),
            CpInfo::MethodRef(MethodRefInfo {
                class_index: 2,
                name_and_type_index: 5,
            }),
            CpInfo::InterfaceMethodRef(InterfaceMethodRefInfo {
                class_index: 2,
                name_and_type_index: 5,
            }),
        ];
        entries.extend(extra);
        ConstantPool::from_entries(entries)
    }

    #[test]
    fn it_should_accept_a_consistent_pool() {
        let cp = pool_with(vec![
            method_handle(5, 6),
            CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: 4,
            }),
            CpInfo::InvokeDynamic(InvokeDynamicInfo {
                bootstrap_method_attr_index: 0,
                name_and_type_index: 5,
            }),
            CpInfo::String(StringInfo { string_index: 3 }),
            CpInfo::Long(LongInfo(1)),
            utf8("[[Ljava/lang/String;"),
            class(14),
        ]);

        validate(&cp, 52, 0).unwrap();
    }

    #[test]
    fn it_should_reject_a_dotted_class_name() {
        let cp = ConstantPool::from_entries(vec![utf8("java.lang.Object"), class(1)]);

        match validate(&cp, 52, 0) {
            Err(ClassFileError::InvalidBinaryName { index, name }) => {
                assert_eq!(index, 2);
                assert_eq!(name, "java.lang.Object");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn it_should_reject_a_class_name_that_is_not_utf8() {
        let cp = ConstantPool::from_entries(vec![class(1)]);

        assert!(matches!(
            validate(&cp, 52, 0),
            Err(ClassFileError::WrongEntryKind {
                index: 1,
                expected: EntryKind::Utf8,
                found: EntryKind::Class
            })
        ));
    }

    #[test]
    fn it_should_reject_a_malformed_array_class_name() {
        let cp = ConstantPool::from_entries(vec![utf8("[Q"), class(1)]);

        assert!(matches!(
            validate(&cp, 52, 0),
            Err(ClassFileError::InvalidBinaryName { index: 2, .. })
        ));
    }

    #[test]
    fn it_should_reject_a_string_pointing_past_the_pool() {
        let cp = ConstantPool::from_entries(vec![CpInfo::String(StringInfo { string_index: 9 })]);

        assert!(matches!(
            validate(&cp, 52, 0),
            Err(ClassFileError::IndexOutOfRange { index: 9, len: 2 })
        ));
    }

    #[test]
    fn it_should_check_interface_method_handles_against_the_version() {
        let cp = pool_with(vec![method_handle(6, 7)]);

        validate(&cp, 52, 0).unwrap();
        assert!(matches!(
            validate(&cp, 51, 0),
            Err(ClassFileError::InvalidMethodHandleReference {
                index: 8,
                reference_kind: 6,
                target: Some(EntryKind::InterfaceMethodRef)
            })
        ));
    }

    #[test]
    fn it_should_match_method_handle_targets_to_reference_kinds() {
        let valid = [(5, 6), (8, 6), (7, 6), (7, 7), (9, 7)];
        for (reference_kind, reference_index) in valid {
            let cp = pool_with(vec![method_handle(reference_kind, reference_index)]);
            assert!(validate(&cp, 52, 0).is_ok(), "kind {}", reference_kind);
        }

        let invalid = [(1, 6), (4, 7), (5, 7), (9, 6), (0, 6), (10, 6), (5, 40)];
        for (reference_kind, reference_index) in invalid {
            let cp = pool_with(vec![method_handle(reference_kind, reference_index)]);
            assert!(
                matches!(
                    validate(&cp, 52, 0),
                    Err(ClassFileError::InvalidMethodHandleReference { index: 8, .. })
                ),
                "kind {}",
                reference_kind
            );
        }
    }

    #[test]
    fn it_should_reject_invalid_descriptors() {
        let cp = pool_with(vec![
            utf8("Q"),
            CpInfo::NameAndType(NameAndTypeInfo {
                name_index: 3,
                descriptor_index: 8,
            }),
        ]);
        assert!(matches!(
            validate(&cp, 52, 0),
            Err(ClassFileError::DescriptorSyntaxError(DescriptorError::InvalidType('Q')))
        ));

        let cp = pool_with(vec![
            utf8("I"),
            CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: 8,
            }),
        ]);
        assert!(matches!(
            validate(&cp, 52, 0),
            Err(ClassFileError::DescriptorSyntaxError(
                DescriptorError::MissingParameterList
            ))
        ));
    }

    #[test]
    fn it_should_require_invoke_dynamic_to_name_a_name_and_type() {
        let cp = pool_with(vec![CpInfo::InvokeDynamic(InvokeDynamicInfo {
            bootstrap_method_attr_index: 0,
            name_and_type_index: 6,
        })]);

        assert!(matches!(
            validate(&cp, 52, 0),
            Err(ClassFileError::WrongEntryKind {
                index: 6,
                expected: EntryKind::NameAndType,
                found: EntryKind::MethodRef
            })
        ));
    }

    #[test]
    fn it_should_report_the_first_offending_entry() {
        let cp = ConstantPool::from_entries(vec![utf8("a.b"), class(1), class(1)]);

        assert!(matches!(
            validate(&cp, 52, 0),
            Err(ClassFileError::InvalidBinaryName { index: 2, .. })
        ));
    }

    #[test]
    fn it_should_validate_binary_names() {
        for name in ["java/lang/Object", "Foo", "a/b$c", "\u{e9}t\u{e9}"] {
            assert!(validate_binary_name(1, &Utf8Text::encode(name)).is_ok(), "{}", name);
        }
        for name in ["a;b", "a[b", "java.lang.Object", "a/b;/c"] {
            assert!(validate_binary_name(1, &Utf8Text::encode(name)).is_err(), "{}", name);
        }
    }

    #[test]
    fn it_should_accept_empty_name_segments() {
        for name in ["", "a//b", "/a", "a/"] {
            assert!(validate_binary_name(1, &Utf8Text::encode(name)).is_ok(), "{}", name);
        }
        assert!(is_unqualified_name(&Utf8Text::encode("")));
    }
}
