// Assembles class files byte by byte, computing attribute lengths, so tests
// do not depend on a JDK being installed.

#![allow(dead_code)]

#[derive(Default)]
pub struct ClassWriter {
    bytes: Vec<u8>,
}

impl ClassWriter {
    pub fn u1(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn u2(&mut self, value: u16) -> &mut Self {
        self.bytes.extend(value.to_be_bytes());
        self
    }

    pub fn u4(&mut self, value: u32) -> &mut Self {
        self.bytes.extend(value.to_be_bytes());
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// A `CONSTANT_Utf8` entry. Only ASCII is written as-is.
    pub fn utf8(&mut self, s: &str) -> &mut Self {
        assert!(s.is_ascii());
        self.u1(1).u2(s.len() as u16).bytes(s.as_bytes())
    }

    /// Tag followed by `u2` operands, for every entry made of indices.
    pub fn entry(&mut self, tag: u8, operands: &[u16]) -> &mut Self {
        self.u1(tag);
        for &operand in operands {
            self.u2(operand);
        }
        self
    }

    pub fn attribute(&mut self, name_index: u16, f: impl FnOnce(&mut ClassWriter)) -> &mut Self {
        let mut info = ClassWriter::default();
        f(&mut info);
        self.u2(name_index)
            .u4(info.bytes.len() as u32)
            .bytes(&info.bytes)
    }

    pub fn code(
        &mut self,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
        line_numbers: &[(u16, u16)],
    ) -> &mut Self {
        self.attribute(HELLO_WORLD_CODE, |w| {
            w.u2(max_stack)
                .u2(max_locals)
                .u4(code.len() as u32)
                .bytes(code)
                .u2(0)
                .u2(1)
                .attribute(HELLO_WORLD_LINE_NUMBER_TABLE, |w| {
                    w.u2(line_numbers.len() as u16);
                    for &(start_pc, line_number) in line_numbers {
                        w.u2(start_pc).u2(line_number);
                    }
                });
        })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

pub const HELLO_WORLD_CONSTANT_POOL_COUNT: u16 = 29;
const HELLO_WORLD_CODE: u16 = 9;
const HELLO_WORLD_LINE_NUMBER_TABLE: u16 = 10;

pub const HELLO_WORLD_INIT_CODE: [u8; 5] = [0x2a, 0xb7, 0x00, 0x01, 0xb1];
pub const HELLO_WORLD_MAIN_CODE: [u8; 9] = [0xb2, 0x00, 0x02, 0x12, 0x03, 0xb6, 0x00, 0x04, 0xb1];

/// What javac 8 emits for:
///
/// ```java
/// public class HelloWorld {
///     public static void main(String[] args) {
///         System.out.println("Hello, World!");
///     }
/// }
/// ```
pub fn hello_world() -> Vec<u8> {
    hello_world_with(&[], &[])
}

/// HelloWorld with `extra_utf8` appended to the constant pool from index 29,
/// and `extra_attributes` as `(name_index, info)` after its `SourceFile`.
pub fn hello_world_with(extra_utf8: &[&str], extra_attributes: &[(u16, &[u8])]) -> Vec<u8> {
    let mut w = ClassWriter::default();

    w.u4(0xCAFEBABE).u2(0).u2(52);

    w.u2(HELLO_WORLD_CONSTANT_POOL_COUNT + extra_utf8.len() as u16)
        .entry(10, &[6, 15])
        .entry(9, &[16, 17])
        .entry(8, &[18])
        .entry(10, &[19, 20])
        .entry(7, &[21])
        .entry(7, &[22])
        .utf8("<init>")
        .utf8("()V")
        .utf8("Code")
        .utf8("LineNumberTable")
        .utf8("main")
        .utf8("([Ljava/lang/String;)V")
        .utf8("SourceFile")
        .utf8("HelloWorld.java")
        .entry(12, &[7, 8])
        .entry(7, &[23])
        .entry(12, &[24, 25])
        .utf8("Hello, World!")
        .entry(7, &[26])
        .entry(12, &[27, 28])
        .utf8("HelloWorld")
        .utf8("java/lang/Object")
        .utf8("java/lang/System")
        .utf8("out")
        .utf8("Ljava/io/PrintStream;")
        .utf8("java/io/PrintStream")
        .utf8("println")
        .utf8("(Ljava/lang/String;)V");
    for s in extra_utf8 {
        w.utf8(s);
    }

    // public super, this HelloWorld, super Object, no interfaces or fields
    w.u2(0x0021).u2(5).u2(6).u2(0).u2(0);

    w.u2(2);
    w.u2(0x0001)
        .u2(7)
        .u2(8)
        .u2(1)
        .code(1, 1, &HELLO_WORLD_INIT_CODE, &[(0, 1)]);
    w.u2(0x0009)
        .u2(11)
        .u2(12)
        .u2(1)
        .code(2, 1, &HELLO_WORLD_MAIN_CODE, &[(0, 3), (8, 4)]);

    w.u2(1 + extra_attributes.len() as u16)
        .attribute(13, |w| {
            w.u2(14);
        });
    for &(name_index, info) in extra_attributes {
        w.attribute(name_index, |w| {
            w.bytes(info);
        });
    }

    w.into_bytes()
}
