use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::frame::{Frame, FrameDisplay, TxId};
use crate::constants::mbap;
use crate::decode::DecodeLevel;
use crate::error::{ProtocolError, RequestError};
use crate::exception::ExceptionCode;

/// Send one request and wait for its response on `io`.
///
/// The caller must hold exclusive access to `io` for the whole exchange.
pub(crate) async fn exchange<T>(
    io: &mut T,
    buffer: &mut [u8; mbap::MAX_FRAME_LENGTH],
    tx_id: TxId,
    request: &mut Frame,
    decode: DecodeLevel,
) -> Result<Frame, RequestError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    request.transaction_id = tx_id.to_u16();

    if decode.enabled() {
        tracing::info!("MBAP TX - {}", FrameDisplay::new(decode, request));
    }

    let bytes = request.encode_into(buffer)?;
    io.write_all(bytes).await?;

    let response = receive(io, buffer).await?;

    if decode.enabled() {
        tracing::info!("MBAP RX - {}", FrameDisplay::new(decode, &response));
    }

    validate(request, response)
}

async fn receive<T>(
    io: &mut T,
    buffer: &mut [u8; mbap::MAX_FRAME_LENGTH],
) -> Result<Frame, RequestError>
where
    T: AsyncRead + Unpin,
{
    // read_exact keeps reading until the requested count arrives or the stream ends
    let (header, rest) = buffer.split_at_mut(mbap::HEADER_LENGTH);
    io.read_exact(header).await?;

    let payload_length = Frame::payload_length(header)?;
    io.read_exact(&mut rest[..payload_length]).await?;

    Ok(Frame::decode(
        &buffer[..mbap::HEADER_LENGTH + payload_length],
    )?)
}

/// Check the response against the request it answers
pub(crate) fn validate(request: &Frame, response: Frame) -> Result<Frame, RequestError> {
    if response.transaction_id != request.transaction_id {
        return Err(ProtocolError::TxIdMismatch {
            request: request.transaction_id,
            response: response.transaction_id,
        }
        .into());
    }

    if response.function_code != request.function_code {
        if response.function_code == request.function_code.wrapping_add(mbap::ERROR_BIT) {
            let exception = ExceptionCode::from(response.payload_cursor().read_u8()?);
            tracing::warn!(
                "Modbus exception {:?} ({:#04X}) in response to function {:#04X}",
                exception,
                u8::from(exception),
                request.function_code
            );
            return Err(RequestError::Exception {
                function: response.function_code,
                exception,
            });
        }

        return Err(ProtocolError::UnexpectedFunction {
            expected: request.function_code,
            actual: response.function_code,
        }
        .into());
    }

    if response.protocol_id != mbap::PROTOCOL_ID {
        return Err(ProtocolError::NonZeroProtocolId(response.protocol_id).into());
    }

    Ok(response)
}
