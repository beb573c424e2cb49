mod common;

use std::{io::Cursor, thread};

use jclass_class_file::{
    attributes::{ClassAttribute, LineNumber},
    Attribute, ByteCursor, ClassAccessFlags, ClassFile, ClassFileError, DescriptorError,
    EntryKind, HeaderError, MethodAccessFlags, MethodDescriptor, Parser,
};

fn with_class_file(f: impl FnOnce(ClassFile)) {
    let _ = pretty_env_logger::try_init();

    f(ClassFile::from_bytes(&common::hello_world()).unwrap());
}

#[test]
fn test_version() {
    with_class_file(|class_file| {
        assert_eq!(0xCAFEBABE, class_file.magic);
        assert_eq!(52, class_file.major_version);
        assert_eq!(0, class_file.minor_version);
    });
}

#[test]
fn test_class_name() {
    with_class_file(|class_file| assert_eq!("HelloWorld", class_file.class_name().unwrap()));
}

#[test]
fn test_super_class() {
    with_class_file(|class_file| {
        assert_eq!(
            Some("java/lang/Object"),
            class_file
                .super_class()
                .unwrap()
                .map(|name| name.to_string())
                .as_deref()
        )
    });
}

#[test]
fn test_class_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            class_file.access_flags
        );
        assert!(class_file.interface_names().unwrap().is_empty());
        assert!(class_file.fields.is_empty());
    });
}

#[test]
fn test_constructor() {
    with_class_file(|class_file| {
        let constructor = &class_file.methods[0];

        assert_eq!("<init>", class_file.method_name(constructor).unwrap());
        assert_eq!("()V", class_file.method_descriptor(constructor).unwrap());
        assert_eq!(MethodAccessFlags::PUBLIC, constructor.access_flags);

        let code = constructor.code().unwrap();
        assert_eq!(1, code.max_stack);
        assert_eq!(1, code.max_locals);
        assert_eq!(common::HELLO_WORLD_INIT_CODE.to_vec(), code.code);
    });
}

#[test]
fn test_main_method() {
    with_class_file(|class_file| {
        let main = &class_file.methods[1];

        assert_eq!("main", class_file.method_name(main).unwrap());
        assert_eq!(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            main.access_flags
        );

        let descriptor = MethodDescriptor::parse(class_file.method_descriptor(main).unwrap()).unwrap();
        assert_eq!("java/lang/String[]", descriptor.parameters()[0].display_name());
        assert_eq!(None, descriptor.return_type());

        let code = main.code().unwrap();
        assert_eq!(2, code.max_stack);
        assert_eq!(common::HELLO_WORLD_MAIN_CODE.to_vec(), code.code);
        assert!(code.exception_table.is_empty());
        assert_eq!(
            vec![
                &LineNumber {
                    start_pc: 0,
                    line_number: 3
                },
                &LineNumber {
                    start_pc: 8,
                    line_number: 4
                },
            ],
            code.line_numbers().collect::<Vec<_>>()
        );
    });
}

#[test]
fn test_source_file() {
    with_class_file(|class_file| {
        assert_eq!("HelloWorld.java", class_file.source_file().unwrap().unwrap())
    });
}

#[test]
fn test_validate() {
    with_class_file(|class_file| class_file.validate().unwrap());
}

#[test]
fn test_validate_references_outside_the_constant_pool() {
    with_class_file(|mut class_file| {
        // "<init>" is not a Class entry.
        class_file.super_class = 7;
        assert!(matches!(
            class_file.validate(),
            Err(ClassFileError::WrongEntryKind {
                index: 7,
                expected: EntryKind::Class,
                found: EntryKind::Utf8
            })
        ));

        class_file.super_class = 6;
        class_file.methods[0].descriptor_index = 11;
        assert!(matches!(
            class_file.validate(),
            Err(ClassFileError::DescriptorSyntaxError(
                DescriptorError::MissingParameterList
            ))
        ));
    });
}

#[test]
fn test_parse_from_reader() {
    let bytes = common::hello_world();

    assert_eq!(
        ClassFile::from_bytes(&bytes).unwrap(),
        ClassFile::parse(Cursor::new(&bytes)).unwrap()
    );
}

#[test]
fn test_invalid_magic_identifier() {
    let mut bytes = common::hello_world();
    bytes[..4].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
    let mut parser = Parser::new(ByteCursor::from_slice(&bytes));

    assert!(matches!(
        parser.parse(),
        Err(ClassFileError::MalformedHeader(
            HeaderError::InvalidMagicIdentifier(0x12345678)
        ))
    ));
    assert_eq!(4, parser.position());
}

#[test]
fn test_trailing_bytes() {
    let mut bytes = common::hello_world();
    bytes.push(0);

    assert!(matches!(
        ClassFile::parse(&bytes[..]),
        Err(ClassFileError::MalformedHeader(HeaderError::TrailingBytes(1)))
    ));
}

#[test]
fn test_truncated_class_file() {
    let bytes = common::hello_world();

    assert!(matches!(
        ClassFile::from_bytes(&bytes[..bytes.len() - 1]),
        Err(ClassFileError::UnexpectedEndOfInput { .. })
    ));
}

#[test]
fn test_serialize_header() {
    let bytes = common::hello_world();
    let class_file = ClassFile::from_bytes(&bytes).unwrap();

    let mut header = Vec::new();
    class_file.serialize_header(&mut header).unwrap();

    assert_eq!(bytes[..header.len()], header[..]);
    // fields_count and methods_count follow the interfaces.
    assert_eq!(bytes[header.len()..header.len() + 4], [0x00, 0x00, 0x00, 0x02]);
}

#[test]
fn test_unknown_attribute_is_kept() {
    let bytes = common::hello_world_with(&["org/example/Custom"], &[(29, &[1, 2, 3][..])]);
    let class_file = ClassFile::from_bytes(&bytes).unwrap();

    assert_eq!(
        ClassAttribute::Unknown(Attribute {
            attribute_name_index: 29,
            info: vec![1, 2, 3]
        }),
        class_file.attributes[1]
    );
    assert_eq!("HelloWorld.java", class_file.source_file().unwrap().unwrap());
}

#[test]
fn test_attribute_with_unresolvable_name_is_kept() {
    let bytes = common::hello_world_with(&[], &[(5, &[0xff][..]), (900, &[][..])]);
    let class_file = ClassFile::from_bytes(&bytes).unwrap();

    assert!(matches!(
        &class_file.attributes[1],
        ClassAttribute::Unknown(Attribute {
            attribute_name_index: 5,
            ..
        })
    ));
    assert!(matches!(
        &class_file.attributes[2],
        ClassAttribute::Unknown(Attribute {
            attribute_name_index: 900,
            ..
        })
    ));
}

#[test]
fn test_known_attribute_with_wrong_length() {
    // A SourceFile with a byte too many.
    let bytes = common::hello_world_with(&[], &[(13, &[0x00, 0x0e, 0x00][..])]);

    assert!(matches!(
        ClassFile::from_bytes(&bytes),
        Err(ClassFileError::AttributeLengthMismatch {
            name: "SourceFile",
            remaining: 1
        })
    ));
}

#[test]
fn test_share_between_threads() {
    with_class_file(|class_file| {
        thread::scope(|s| {
            let handles = (0..4)
                .map(|_| s.spawn(|| class_file.class_name().unwrap().to_string()))
                .collect::<Vec<_>>();

            for handle in handles {
                assert_eq!("HelloWorld", handle.join().unwrap());
            }
        });
    });
}
