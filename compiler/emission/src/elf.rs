//! Minimal ELF64 executable image: a 64-byte header and exactly one
//! loadable, executable segment mapping the whole file. No section
//! headers — the loader only reads the program header table.

/// Virtual address the file is mapped at.
pub const BASE_VADDR: u64 = 0x400000;

const EHSIZE: u16 = 0x40;
const PHENTSIZE: u16 = 0x38;
const HEADERS_LEN: u64 = EHSIZE as u64 + PHENTSIZE as u64;

const ET_EXEC: u16 = 0x0002;
const EM_X86_64: u16 = 0x003E;
const EV_CURRENT: u8 = 0x01;
const CLASS_64: u8 = 0x02;
const DATA2LSB: u8 = 0x01;
const SYSV_ABI: u8 = 0x00;

const PT_LOAD: u32 = 0x0001;
const PF_X: u32 = 0x1;
const PF_R: u32 = 0x4;

/// Virtual address of the first code byte (the code follows the headers
/// immediately in the file, and the file is mapped in one piece).
pub fn load_addr() -> u64 {
    BASE_VADDR + HEADERS_LEN
}

/// Wraps the linked code buffer into a runnable image. `entry_offset` is
/// the byte offset of the entry label within `code`.
pub fn write_elf(code: &[u8], entry_offset: u64) -> Vec<u8> {
    let mut image = Vec::with_capacity(HEADERS_LEN as usize + code.len());
    let file_len = HEADERS_LEN + code.len() as u64;

    // e_ident
    image.extend_from_slice(&[0x7F, b'E', b'L', b'F']);
    image.push(CLASS_64);
    image.push(DATA2LSB);
    image.push(EV_CURRENT);
    image.push(SYSV_ABI);
    image.extend_from_slice(&[0; 8]); // ABI version + padding

    push_u16(&mut image, ET_EXEC);
    push_u16(&mut image, EM_X86_64);
    push_u32(&mut image, EV_CURRENT as u32);
    push_u64(&mut image, load_addr() + entry_offset); // e_entry
    push_u64(&mut image, EHSIZE as u64); // e_phoff: right after the header
    push_u64(&mut image, 0); // e_shoff: no section table
    push_u32(&mut image, 0); // e_flags
    push_u16(&mut image, EHSIZE);
    push_u16(&mut image, PHENTSIZE);
    push_u16(&mut image, 1); // e_phnum
    push_u16(&mut image, 0x40); // e_shentsize
    push_u16(&mut image, 0); // e_shnum
    push_u16(&mut image, 0); // e_shstrndx

    // the single PT_LOAD segment: the whole file, R+X
    push_u32(&mut image, PT_LOAD);
    push_u32(&mut image, PF_R | PF_X);
    push_u64(&mut image, 0); // p_offset
    push_u64(&mut image, BASE_VADDR); // p_vaddr
    push_u64(&mut image, BASE_VADDR); // p_paddr
    push_u64(&mut image, file_len); // p_filesz
    push_u64(&mut image, file_len); // p_memsz
    push_u64(&mut image, 0x1000); // p_align

    image.extend_from_slice(code);
    image
}

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(image: &[u8], at: usize) -> u16 {
        u16::from_le_bytes(image[at..at + 2].try_into().unwrap())
    }

    fn u32_at(image: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(image[at..at + 4].try_into().unwrap())
    }

    fn u64_at(image: &[u8], at: usize) -> u64 {
        u64::from_le_bytes(image[at..at + 8].try_into().unwrap())
    }

    #[test]
    fn header_identifies_an_x86_64_executable() {
        let image = write_elf(&[0x0F, 0x05], 0);

        assert_eq!(&image[0..4], &[0x7F, b'E', b'L', b'F']);
        assert_eq!(image[4], 2); // 64-bit
        assert_eq!(image[5], 1); // little-endian
        assert_eq!(u16_at(&image, 16), 2); // ET_EXEC
        assert_eq!(u16_at(&image, 18), 62); // EM_X86_64
    }

    #[test]
    fn entry_points_at_the_first_code_byte() {
        let image = write_elf(&[0xC3], 0);

        assert_eq!(u64_at(&image, 24), 0x400078);
    }

    #[test]
    fn entry_offset_is_added_to_the_load_address() {
        let image = write_elf(&[0x90, 0x90, 0xC3], 2);

        assert_eq!(u64_at(&image, 24), 0x400078 + 2);
    }

    #[test]
    fn single_loadable_segment_spans_the_whole_file() {
        let code = [0xC3, 0x90, 0x90];
        let image = write_elf(&code, 0);

        assert_eq!(u16_at(&image, 56), 1); // e_phnum
        assert_eq!(u32_at(&image, 0x40), 1); // PT_LOAD
        assert_eq!(u32_at(&image, 0x44), 5); // R+X
        assert_eq!(u64_at(&image, 0x48), 0); // p_offset
        assert_eq!(u64_at(&image, 0x50), 0x400000); // p_vaddr
        assert_eq!(u64_at(&image, 0x60), image.len() as u64); // p_filesz
        assert_eq!(u64_at(&image, 0x68), image.len() as u64); // p_memsz

        assert_eq!(image.len(), 0x78 + code.len());
        assert_eq!(&image[0x78..], &code);
    }
}
