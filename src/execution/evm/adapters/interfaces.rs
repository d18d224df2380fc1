//! Call shapes of the external protocols the adapters talk to.
#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    interface IWrappedNative {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }

    interface IUniswapV2Router02 {
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);

        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] memory amounts);

        function swapExactTokensForETH(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }

    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }

        function exactInputSingle(ExactInputSingleParams calldata params)
            external payable returns (uint256 amountOut);

        function exactInput(ExactInputParams calldata params)
            external payable returns (uint256 amountOut);
    }

    interface ICurvePool {
        function exchange(int128 i, int128 j, uint256 dx, uint256 min_dy)
            external payable returns (uint256);

        function exchange_underlying(int128 i, int128 j, uint256 dx, uint256 min_dy)
            external payable returns (uint256);
    }

    interface IBalancerVault {
        struct SingleSwap {
            bytes32 poolId;
            uint8 kind;
            address assetIn;
            address assetOut;
            uint256 amount;
            bytes userData;
        }

        struct BatchSwapStep {
            bytes32 poolId;
            uint256 assetInIndex;
            uint256 assetOutIndex;
            uint256 amount;
            bytes userData;
        }

        struct FundManagement {
            address sender;
            bool fromInternalBalance;
            address recipient;
            bool toInternalBalance;
        }

        function swap(
            SingleSwap memory singleSwap,
            FundManagement memory funds,
            uint256 limit,
            uint256 deadline
        ) external payable returns (uint256 amountCalculated);

        function batchSwap(
            uint8 kind,
            BatchSwapStep[] memory swaps,
            address[] memory assets,
            FundManagement memory funds,
            int256[] memory limits,
            uint256 deadline
        ) external payable returns (int256[] memory assetDeltas);
    }

    interface IAcrossSpokePool {
        function deposit(
            address recipient,
            address originToken,
            uint256 amount,
            uint256 destinationChainId,
            int64 relayerFeePct,
            uint32 quoteTimestamp,
            bytes memory message,
            uint256 maxCount
        ) external payable;
    }

    interface ICelerBridge {
        function send(
            address _receiver,
            address _token,
            uint256 _amount,
            uint64 _dstChainId,
            uint64 _nonce,
            uint32 _maxSlippage
        ) external;

        function sendNative(
            address _receiver,
            uint256 _amount,
            uint64 _dstChainId,
            uint64 _nonce,
            uint32 _maxSlippage
        ) external payable;
    }

    interface IStargateRouter {
        struct LzTxObj {
            uint256 dstGasForCall;
            uint256 dstNativeAmount;
            bytes dstNativeAddr;
        }

        function swap(
            uint16 _dstChainId,
            uint256 _srcPoolId,
            uint256 _dstPoolId,
            address _refundAddress,
            uint256 _amountLD,
            uint256 _minAmountLD,
            LzTxObj memory _lzTxParams,
            bytes calldata _to,
            bytes calldata _payload
        ) external payable;
    }

    interface IHopL1Bridge {
        function sendToL2(
            uint256 chainId,
            address recipient,
            uint256 amount,
            uint256 amountOutMin,
            uint256 deadline,
            address relayer,
            uint256 relayerFee
        ) external payable;
    }
}

/// Balancer `SwapKind.GIVEN_IN`.
pub const GIVEN_IN: u8 = 0;
