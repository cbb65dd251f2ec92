use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};

use crate::{
    ExecutionStateInfo, Heap, HeapCreateInfo, OBJECT_ALIGN, SpecialObjects,
    TypeId, VM, Value, is_type,
};

const IMAGE_MAGIC: &[u8; 8] = b"OBJCIMG\0";
const IMAGE_VERSION: u32 = 1;

/// Write the allocated part of the heap and the special objects to `path`.
///
/// Objects are stored by offset, so the image does not depend on where the
/// heap is mapped. Handles are written as they are and expire on load.
pub fn save_image(vm: &VM, path: &Path) -> io::Result<()> {
    let heap = &vm.heap;
    let t = special_offset(heap, vm.specials.t)?;
    let f = special_offset(heap, vm.specials.f)?;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(IMAGE_MAGIC)?;
    write_u32(&mut writer, IMAGE_VERSION)?;
    write_u64(&mut writer, heap.capacity() as u64)?;
    write_u64(&mut writer, heap.used() as u64)?;
    write_u64(&mut writer, t as u64)?;
    write_u64(&mut writer, f as u64)?;
    writer.write_all(heap.as_bytes())?;
    writer.flush()?;

    info!(
        "saved image {} ({} of {} bytes)",
        path.display(),
        heap.used(),
        heap.capacity()
    );
    Ok(())
}

/// Read an image into a freshly mapped heap. Every handle in it is expired
/// before the VM is returned.
pub fn load_image(path: &Path) -> io::Result<VM> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != IMAGE_MAGIC {
        return Err(invalid_data("invalid image magic"));
    }
    let version = read_u32(&mut reader)?;
    if version != IMAGE_VERSION {
        return Err(invalid_data("unsupported image version"));
    }

    let size = read_usize(&mut reader)?;
    let used = read_usize(&mut reader)?;
    if used > size || used % OBJECT_ALIGN != 0 {
        return Err(invalid_data("heap size mismatch"));
    }
    let t = read_usize(&mut reader)?;
    let f = read_usize(&mut reader)?;

    let mut bytes = vec![0u8; used];
    reader.read_exact(&mut bytes)?;

    let mut heap = Heap::try_new(HeapCreateInfo { size })?;
    heap.restore(&bytes)
        .map_err(|_| invalid_data("image does not fit its heap"))?;
    if !heap.is_walkable() {
        return Err(invalid_data("corrupt object in image"));
    }

    let specials = SpecialObjects {
        t: special_value(&heap, t)?,
        f: special_value(&heap, f)?,
    };
    let expired = heap.expire_handles();
    debug!("expired {expired} handles from {}", path.display());
    info!("loaded image {} ({used} bytes)", path.display());

    Ok(VM::from_parts(heap, specials, &ExecutionStateInfo::default()))
}

fn special_offset(heap: &Heap, value: Value) -> io::Result<usize> {
    heap.offset_of(value)
        .ok_or_else(|| invalid_data("special object outside the heap"))
}

fn special_value(heap: &Heap, offset: usize) -> io::Result<Value> {
    heap.value_at(offset)
        .filter(|&value| is_type(TypeId::Boolean, value))
        .ok_or_else(|| invalid_data("invalid special object offset"))
}

fn write_u32(w: &mut dyn Write, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_u32(r: &mut dyn Read) -> io::Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn write_u64(w: &mut dyn Write, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_u64(r: &mut dyn Read) -> io::Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

fn read_usize(r: &mut dyn Read) -> io::Result<usize> {
    usize::try_from(read_u64(r)?).map_err(|_| invalid_data("size overflow"))
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Allocator, Header, ObjectType, StringObject, VMCreateInfo, dereference,
        untag_as,
    };
    use std::path::PathBuf;

    fn image_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("objcore-{tag}-{}.img", std::process::id()))
    }

    #[test]
    fn handles_expire_and_strings_survive() {
        let path = image_path("roundtrip");
        let mut vm = VM::new(VMCreateInfo::default());
        let s = vm.heap.allocate_str("persistent").expect("alloc");
        let h = vm.heap.make_handle(s.as_value()).expect("alloc");
        let h_offset = vm.heap.offset_of(h.as_value()).expect("in heap");
        let s_offset = vm.heap.offset_of(s.as_value()).expect("in heap");
        assert_eq!(dereference(h.as_value()), Ok(s.as_value()));

        save_image(&vm, &path).expect("save");
        let loaded = load_image(&path).expect("load");
        std::fs::remove_file(&path).expect("cleanup");

        assert_eq!(loaded.heap.used(), vm.heap.used());
        assert_eq!(loaded.heap.live_handles(), 0);
        assert!(is_type(TypeId::Boolean, loaded.specials.t));
        assert_ne!(loaded.specials.t, loaded.specials.f);

        let handle = loaded.heap.value_at(h_offset).expect("handle");
        assert!(dereference(handle).is_err());

        let string = loaded.heap.value_at(s_offset).expect("string");
        let string = untag_as::<StringObject>(string).expect("string");
        // SAFETY: no allocation
        assert_eq!(unsafe { string.as_ref() }.to_string_lossy(), "persistent");

        // the original VM keeps its handle
        assert_eq!(dereference(h.as_value()), Ok(s.as_value()));
    }

    #[test]
    fn bad_magic_is_invalid_data() {
        let path = image_path("magic");
        std::fs::write(&path, b"NOTANIMG\x01\0\0\0").expect("write");
        let err = load_image(&path).unwrap_err();
        std::fs::remove_file(&path).expect("cleanup");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    fn write_raw_image(path: &Path, used: u64, heap: &[u8]) {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(IMAGE_MAGIC);
        write_u32(&mut bytes, IMAGE_VERSION).expect("write");
        for word in [4096, used, 0, 0] {
            write_u64(&mut bytes, word).expect("write");
        }
        bytes.extend_from_slice(heap);
        std::fs::write(path, bytes).expect("write");
    }

    /// A string header followed by `capacity`, zeroed hash and no chars.
    fn raw_string(capacity: u64) -> Vec<u8> {
        let mut object = vec![0u8; size_of::<StringObject>()];
        object[0] = ((ObjectType::String as u8) << Header::TYPE_SHIFT)
            | Header::TAG_MASK;
        object[8..16].copy_from_slice(&capacity.to_le_bytes());
        object
    }

    #[test]
    fn corrupt_objects_are_invalid_data() {
        let path = image_path("corrupt");
        let string = raw_string(u64::MAX / 2);
        let overrun = raw_string(100);
        let cases: [(u64, &[u8]); 4] = [
            // capacity overflows the size computation
            (string.len() as u64, string.as_slice()),
            // header only, fixed fields cut off
            (8, &string[..8]),
            // characters run past the used bytes
            (overrun.len() as u64, overrun.as_slice()),
            // not a header at all
            (8, &[0u8; 8][..]),
        ];
        for (used, heap) in cases {
            write_raw_image(&path, used, heap);
            let err = load_image(&path).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        }
        std::fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn truncated_image_fails() {
        let path = image_path("truncated");
        let vm = VM::new(VMCreateInfo::default());
        save_image(&vm, &path).expect("save");
        let bytes = std::fs::read(&path).expect("read");
        std::fs::write(&path, &bytes[..bytes.len() - 4]).expect("write");
        let err = load_image(&path).unwrap_err();
        std::fs::remove_file(&path).expect("cleanup");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
