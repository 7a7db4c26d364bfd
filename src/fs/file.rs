// src/fs/file.rs
//
// A cursor over a single inode with a one-block write-through cache.
// Borrows the file system mutably for its whole lifetime since every
// write can allocate blocks and rewrite the inode table.

use crate::disk::BlockDevice;
use crate::error::{KernelError, KernelResult};

use super::{FileSystem, BLOCK_SIZE, MAX_BLOCKS_PER_FILE};

pub struct File<'a, 'd, D: BlockDevice> {
    fs: &'a mut FileSystem<'d, D>,
    id: i32,
    position: u32,
    cached_block: Option<usize>,
    cache: [u8; BLOCK_SIZE],
}

impl<'a, 'd, D: BlockDevice> File<'a, 'd, D> {
    pub fn open(fs: &'a mut FileSystem<'d, D>, id: i32) -> KernelResult<Self> {
        fs.inode(id).ok_or(KernelError::InvalidReference)?;
        Ok(File { fs, id, position: 0, cached_block: None, cache: [0u8; BLOCK_SIZE] })
    }

    fn file_length(&self) -> u32 {
        self.fs.inode(self.id).map(|i| i.file_length).unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.cached_block = None;
    }

    pub fn eof(&self) -> bool {
        self.position >= self.file_length()
    }

    /// Read up to `n` bytes into `buf`, clamped to the remaining file
    /// length. Never dirties the cache.
    pub fn read(&mut self, n: u32, buf: &mut [u8]) -> KernelResult<u32> {
        let remaining = self.file_length().saturating_sub(self.position);
        let to_read = core::cmp::min(n, remaining);
        let mut done = 0u32;

        while done < to_read {
            let logical_block = (self.position / BLOCK_SIZE as u32) as usize;
            let offset = (self.position % BLOCK_SIZE as u32) as usize;

            if self.cached_block != Some(logical_block) {
                match self.fs.data_block_for(self.id, logical_block, false)? {
                    Some(block) => self.fs.read_block_into(block, &mut self.cache)?,
                    None => self.cache = [0u8; BLOCK_SIZE],
                }
                self.cached_block = Some(logical_block);
            }

            let chunk = core::cmp::min(BLOCK_SIZE - offset, (to_read - done) as usize);
            buf[done as usize..done as usize + chunk].copy_from_slice(&self.cache[offset..offset + chunk]);
            self.position += chunk as u32;
            done += chunk as u32;
        }
        Ok(done)
    }

    /// Write up to `n` bytes from `buf`, clamped to the file's
    /// maximum size. Allocates data blocks on demand; running out of
    /// free blocks truncates the write rather than failing it.
    /// Every modified block is persisted immediately.
    pub fn write(&mut self, n: u32, buf: &[u8]) -> KernelResult<u32> {
        let max_len = (MAX_BLOCKS_PER_FILE * BLOCK_SIZE) as u32;
        let to_write = core::cmp::min(n, max_len.saturating_sub(self.position));
        let mut done = 0u32;

        while done < to_write {
            let logical_block = (self.position / BLOCK_SIZE as u32) as usize;
            let offset = (self.position % BLOCK_SIZE as u32) as usize;

            let block = match self.fs.data_block_for(self.id, logical_block, true) {
                Ok(Some(block)) => block,
                Ok(None) => break,
                Err(KernelError::AllocationExhausted) => break,
                Err(e) => return Err(e),
            };

            if self.cached_block != Some(logical_block) {
                self.fs.read_block_into(block, &mut self.cache)?;
                self.cached_block = Some(logical_block);
            }

            let chunk = core::cmp::min(BLOCK_SIZE - offset, (to_write - done) as usize);
            self.cache[offset..offset + chunk].copy_from_slice(&buf[done as usize..done as usize + chunk]);
            self.fs.write_block_from(block, &self.cache)?;

            self.position += chunk as u32;
            done += chunk as u32;
            self.fs.stretch_file_length(self.id, self.position)?;
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryDisk;

    #[test]
    fn round_trip_within_one_block() {
        let disk = MemoryDisk::new(64);
        let mut fs = FileSystem::format(&disk, 64).unwrap();
        fs.create_file(1).unwrap();

        let data = b"hello, teaching kernel";
        {
            let mut file = File::open(&mut fs, 1).unwrap();
            assert_eq!(file.write(data.len() as u32, data).unwrap(), data.len() as u32);
        }

        let mut out = [0u8; 64];
        let mut file = File::open(&mut fs, 1).unwrap();
        file.reset();
        let n = file.read(data.len() as u32, &mut out).unwrap();
        assert_eq!(n, data.len() as u32);
        assert_eq!(&out[..n as usize], data);
        assert!(file.eof());
    }

    #[test]
    fn round_trip_spans_multiple_blocks() {
        let disk = MemoryDisk::new(64);
        let mut fs = FileSystem::format(&disk, 64).unwrap();
        fs.create_file(2).unwrap();

        let data = [0xABu8; 2048];
        {
            let mut file = File::open(&mut fs, 2).unwrap();
            file.write(data.len() as u32, &data).unwrap();
        }

        let inode = fs.inode(2).unwrap();
        assert_eq!(inode.num_blocks, 4);
        assert_eq!(inode.file_length, 2048);

        let mut out = [0u8; 2048];
        let mut file = File::open(&mut fs, 2).unwrap();
        file.reset();
        let n = file.read(2048, &mut out).unwrap();
        assert_eq!(n, 2048);
        assert_eq!(&out[..], &data[..]);
    }

    #[test]
    fn delete_frees_data_and_indirect_blocks() {
        let disk = MemoryDisk::new(64);
        let mut fs = FileSystem::format(&disk, 64).unwrap();
        fs.create_file(3).unwrap();
        {
            let mut file = File::open(&mut fs, 3).unwrap();
            file.write(2048, &[1u8; 2048]).unwrap();
        }
        let free_before = fs.free_block_count();
        fs.delete_file(3).unwrap();
        let free_after = fs.free_block_count();
        assert_eq!(free_after, free_before + 5); // 4 data blocks + 1 indirect
    }
}
