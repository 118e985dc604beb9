use uuid::Uuid;

use error::SMBError;

pub mod error;
pub mod logging;
pub mod nt_status;

pub type SMBResult<T> = Result<T, SMBError>;
pub type SMBParseResult<I, O> = Result<(I, O), SMBError>;

pub trait SMBByteSize {
    fn smb_byte_size(&self) -> usize;
}

pub trait SMBFromBytes: SMBByteSize {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized;
}

pub trait SMBToBytes: SMBByteSize {
    fn smb_to_bytes(&self) -> Vec<u8>;
}

impl SMBFromBytes for Uuid {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        if input.len() < 16 {
            return Err(SMBError::payload_too_small(16_usize, input.len()));
        }
        // GUIDs travel in the mixed-endian Windows layout
        let uuid = Uuid::from_bytes_le(<[u8; 16]>::smb_from_bytes(input)?.1);
        Ok((&input[16..], uuid))
    }
}

impl SMBByteSize for Uuid {
    fn smb_byte_size(&self) -> usize {
        self.as_bytes().len()
    }
}

impl SMBToBytes for Uuid {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.to_bytes_le().to_vec()
    }
}

macro_rules! impl_parse_fixed_slice {
    ($size: expr, $input: expr) => {{
        if $input.len() < $size {
            return Err(SMBError::payload_too_small($size as usize, $input.len()));
        }
        let res = <[u8; $size]>::try_from(&$input[0..$size])
            .map_err(|_e| SMBError::parse_error("Invalid byte slice"))?;
        Ok::<_, SMBError>((&$input[$size..], res))
    }}
}

macro_rules! impl_smb_byte_size_for_slice {(
    $($N:literal)*
) => (
    $(
        impl SMBByteSize for [u8; $N] {
            fn smb_byte_size(&self) -> usize {
                $N
            }
        }
    )*
)}

macro_rules! impl_smb_from_bytes_for_slice {(
    $($N:literal)*
) => (
    $(
        impl SMBFromBytes for [u8; $N] {
            fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
                impl_parse_fixed_slice!($N, input)
            }
        }
    )*
)}

macro_rules! impl_smb_to_bytes_for_slice {(
    $($N:literal)*
) => (
    $(
        impl SMBToBytes for [u8; $N] {
            fn smb_to_bytes(&self) -> Vec<u8> {
                self.to_vec()
            }
        }
    )*
)}

macro_rules! impl_smb_byte_size_unsigned_type {(
    $($t:ty)*
) => (
    $(
        impl SMBByteSize for $t {
            fn smb_byte_size(&self) -> usize {
                std::mem::size_of_val(self)
            }
        }
    )*
)}

macro_rules! impl_smb_from_bytes_unsigned_type {(
    $($t:ty)*
) => (
    $(
        impl SMBFromBytes for $t {
            fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
                const T_SIZE: usize = std::mem::size_of::<$t>();
                let value = impl_parse_fixed_slice!(T_SIZE, input)?;
                Ok((value.0, <$t>::from_le_bytes(value.1)))
            }
        }
    )*
)}

macro_rules! impl_smb_to_bytes_unsigned_type {(
    $($t:ty)*
) => (
    $(
        impl SMBToBytes for $t {
            fn smb_to_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }
        }
    )*
)}

impl_smb_byte_size_for_slice! {
    1 2 3 4 8 16
}

impl_smb_from_bytes_for_slice! {
    1 2 3 4 8 16
}

impl_smb_to_bytes_for_slice! {
    1 2 3 4 8 16
}

impl_smb_byte_size_unsigned_type! {
    u8 u16 u32 u64
}

impl_smb_from_bytes_unsigned_type! {
    u8 u16 u32 u64
}

impl_smb_to_bytes_unsigned_type! {
    u8 u16 u32 u64
}
